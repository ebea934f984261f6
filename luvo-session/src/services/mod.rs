pub mod call_service;
pub mod interaction_service;
pub mod stream_service;
pub mod swipe_service;

pub use call_service::CallService;
pub use interaction_service::InteractionService;
pub use stream_service::StreamService;
pub use swipe_service::SwipeService;
