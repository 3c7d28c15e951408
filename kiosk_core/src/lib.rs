//! Interaction core for the food-kiosk carousel: input unification,
//! selection, per-frame animation, the overlay reveal sequence, and the
//! session that wires them to audio, particle and overlay collaborators.
//! Nothing in this crate touches a window or GPU; hosts drive it through
//! [`Session::tick`] and the traits in [`ports`].

pub mod animation;
pub mod catalog;
pub mod commerce;
pub mod config;
pub mod error;
pub mod events;
pub mod input;
pub mod overlay;
pub mod ports;
pub mod selection;
pub mod session;
pub mod shopkeeper;
pub mod timers;

pub use animation::{AnimationDriver, Impulse, ImpulseKind, ItemAnimationState, ItemTransform};
pub use catalog::{Appearance, Item, ItemDetails, ItemRegistry, MenuCatalog, MeshHandle, Primitive};
pub use commerce::{QuantityAction, QuantityChange, QuantityState, Wallet};
pub use config::KioskConfig;
pub use error::{KioskError, Result};
pub use events::{EventBus, SessionEvent};
pub use input::{InputUnifier, Intent};
pub use overlay::{OverlayRevealController, OverlayRevealState};
pub use selection::{Direction, SelectionModel};
pub use session::Session;
