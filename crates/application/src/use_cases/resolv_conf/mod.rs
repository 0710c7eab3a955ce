pub mod sync;

pub use sync::{SyncOutcome, SyncResolvConfUseCase};
