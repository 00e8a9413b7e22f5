mod middleware;
mod public;

pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use public::{HttpState, MAX_SEARCH_TERM_CHARS, build_router};
