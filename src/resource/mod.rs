//! # Resources
//!
//! One [`ResourceHandler`](crate::controller::reconciler::ResourceHandler)
//! per Global Accelerator resource kind.
//!
//! | Kind | Polls watch |
//! |------|-------------|
//! | accelerator | the accelerator's own deployment status |
//! | listener | the owning accelerator |
//! | endpoint group | the owning accelerator |
//! | cross-account attachment | the attachment's existence |

pub mod accelerator;
pub mod attachment;
pub mod endpoint_group;
pub mod listener;
pub mod tags;

pub use accelerator::{AcceleratorHandler, AcceleratorModel};
pub use attachment::{AttachmentHandler, CrossAccountAttachmentModel};
pub use endpoint_group::{EndpointGroupHandler, EndpointGroupModel};
pub use listener::{ListenerHandler, ListenerModel};
