use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Crawl ran out of work with {pending} package(s) still pending")]
    Stalled { pending: usize },

    #[error("License report for this crawl was already taken")]
    AlreadyReported,
}
