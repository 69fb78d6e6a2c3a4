//! Contract bindings for the factory and the markets it deploys.
//!
//! Only the read methods and events the reconciliation engine consumes are
//! declared here; the contracts themselves are deployed and immutable.

alloy::sol! {
    interface IMarketFactory {
        function getAllMarkets() external view returns (address[] memory);
        function totalMarkets() external view returns (uint256);
        function allMarkets(uint256 index) external view returns (address);
        function getPools(uint256 marketIndex) external view returns (uint256[] memory);

        event ProtocolFeeCollected(uint256 indexed marketId, uint256 amount, address indexed collector);
    }

    interface IPredictionMarket {
        function title() external view returns (string memory);
        function endTime() external view returns (uint256);
        function resolved() external view returns (bool);
        function winningOutcome() external view returns (uint256);
        function getPoolTotals() external view returns (uint256[] memory);

        event BetPlaced(address indexed bettor, uint256 indexed outcomeIndex, uint256 amount);
        event PoolUpdated(uint256 indexed outcomeIndex, uint256 totalPool);
        event WinningsClaimed(address indexed claimant, uint256 outcomeIndex, uint256 amount);
    }
}

pub use IMarketFactory::ProtocolFeeCollected;
pub use IPredictionMarket::{BetPlaced, PoolUpdated, WinningsClaimed};
