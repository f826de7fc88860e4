pub mod control;
pub mod engine;
pub mod error;
pub mod events;
pub mod extract;
pub mod locator;
pub mod page;
pub mod scripted;
pub mod session;
pub mod store;

pub use control::{ControlMessage, EngineController};
pub use engine::{SessionOutcome, TraversalEngine};
pub use error::EngineError;
pub use events::{ChannelSink, EngineEvent, EventSink, NullSink};
pub use extract::{extract_detail, ExtractError};
pub use locator::locate;
pub use page::{NodeId, PageError, PageModel};
pub use scripted::{PageScript, ScriptError, ScriptedPage};
pub use session::{SessionFlags, SessionState};
pub use store::{JsonFileStore, NullStore, RecordStore, StoreError, COLLECTION_KEY};
