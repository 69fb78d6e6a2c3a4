use futures::{stream, Stream};

use crate::error::Error;

use super::{logs_in_range, ChainLog, ChainReader, LogFilter};

/// Logs for one contiguous block window. Once a page is fully applied its
/// `to_block` is the cursor to persist.
#[derive(Debug, Clone)]
pub struct LogPage {
    pub from_block: u64,
    pub to_block: u64,
    pub logs: Vec<ChainLog>,
}

/// Restartable poll over historical logs. Nothing is fetched until the
/// stream is polled, and no position is kept in memory between runs: a
/// caller resumes by building a new feed from its persisted cursor.
pub struct EventFeed<'a> {
    chain: &'a dyn ChainReader,
    filter: LogFilter,
    page_size: u64,
    max_range: u64,
}

impl<'a> EventFeed<'a> {
    pub fn new(
        chain: &'a dyn ChainReader,
        filter: LogFilter,
        page_size: u64,
        max_range: u64,
    ) -> Self {
        EventFeed {
            chain,
            filter,
            page_size: page_size.max(1),
            max_range,
        }
    }

    pub fn pages(
        self,
        from_block: u64,
        to_block: u64,
    ) -> impl Stream<Item = Result<LogPage, Error>> + 'a {
        stream::try_unfold(
            (self, Some(from_block)),
            move |(feed, next)| async move {
                let next = match next {
                    Some(next) if next <= to_block => next,
                    _ => return Ok(None),
                };

                let end = next.saturating_add(feed.page_size - 1).min(to_block);
                let filter = feed.filter.range(next, end);
                let logs =
                    logs_in_range(feed.chain, &filter, feed.max_range).await?;

                let page = LogPage {
                    from_block: next,
                    to_block: end,
                    logs,
                };

                Ok(Some((page, (feed, end.checked_add(1)))))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{Address, B256, U256},
        sol_types::SolEvent,
    };
    use futures::TryStreamExt;

    use super::*;
    use crate::{
        provider::mock::{event_log, MockChain},
        types::abi::PoolUpdated,
    };

    #[tokio::test]
    async fn pages_cover_the_range_once() {
        let market = Address::repeat_byte(0xaa);
        let chain = MockChain::new();
        for block in [1u64, 4, 7, 10] {
            chain.push_log(event_log(
                market,
                &PoolUpdated {
                    outcomeIndex: U256::ZERO,
                    totalPool: U256::from(block),
                },
                block,
                0,
                B256::repeat_byte(block as u8),
            ));
        }

        let topics = vec![PoolUpdated::SIGNATURE_HASH];
        let filter = LogFilter::new(vec![market], topics);
        let pages: Vec<LogPage> = EventFeed::new(&chain, filter, 4, 100)
            .pages(1, 10)
            .try_collect()
            .await
            .unwrap();

        let windows: Vec<_> =
            pages.iter().map(|p| (p.from_block, p.to_block)).collect();
        assert_eq!(windows, vec![(1, 4), (5, 8), (9, 10)]);

        let counts: Vec<_> = pages.iter().map(|p| p.logs.len()).collect();
        assert_eq!(counts, vec![2, 1, 1]);
    }

    #[tokio::test]
    async fn a_failed_page_ends_the_stream_with_the_error() {
        let chain = MockChain::new();
        chain.set_down(true);

        let filter = LogFilter::new(vec![], vec![]);
        let result: Result<Vec<LogPage>, Error> =
            EventFeed::new(&chain, filter, 4, 100)
                .pages(0, 10)
                .try_collect()
                .await;

        assert!(matches!(result, Err(Error::ChainUnavailable(_))));
    }
}
