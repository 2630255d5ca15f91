pub mod advanced_results;
pub mod pagination;

pub use advanced_results::{AdvancedResults, Populate, BOOTCAMP_SUMMARY};
pub use pagination::{paginate, PageRef, PaginationLinks, PaginationWindow};
