pub mod domain;
pub mod outline;
pub mod placeholders;
pub mod policy;
pub mod ports;
pub mod state;

pub use domain::{
    ClassType, KnowledgeRecall, PptTemplate, RecallCandidate, ReferenceFile, Session,
    SessionConfig, WebSearchHit, WebSearchResult, TITLE_SUFFIX,
};
pub use outline::{OutlineError, OutlineNode, OutlineRow};
pub use policy::{BackfillPolicy, NotFoundPolicy, Operation, Stage};
pub use ports::{
    DocumentConverter, KnowledgeRetriever, PortError, PortResult, SessionStore, WebSearcher,
};
pub use state::{SessionState, TransitionError};
