pub mod convert;
pub mod db;
pub mod memory;
pub mod recall;
pub mod web_search;

pub use convert::PlainTextConverter;
pub use db::PgStore;
pub use memory::InMemoryStore;
pub use recall::StaticRetriever;
pub use web_search::{DisabledWebSearcher, OpenAiWebSearcher};
