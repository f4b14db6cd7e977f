//! Client-side catalog state: filtering, search and pagination over a
//! fetched template snapshot.

pub mod criteria;
pub mod engine;
pub mod escape;
pub mod filter;
pub mod pagination;

pub use criteria::{FilterCriteria, FilterPatch, PowerInput, ANY, POWER_CEILING, POWER_FLOOR};
pub use engine::{CatalogStateEngine, CatalogSubscription, CatalogView};
pub use escape::{escape_html, strip_control, CardTile, ListingRow};
pub use filter::apply_filters;
pub use pagination::{paginate, Page, PaginationState, ITEMS_PER_PAGE};
