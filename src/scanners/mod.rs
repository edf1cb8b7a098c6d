pub mod candidate_filter;
pub mod dex_screener;
