//! Interaction state for the public Valentine page.
//!
//! Everything here is synchronous and side-effect free. Time enters only
//! through explicit `Instant` arguments, so timers are deadlines checked by
//! the caller rather than callbacks.
//!
//! The page script is driven from this crate in two ways. The reveal flow
//! follows the serialized [`Choreography`], which carries every transition
//! and its effects. [`SwipeDeck`] and [`LoveBook`] are the reference model
//! for the deck and book widgets: the renderer takes their initial stack and
//! spread plus the swipe threshold, stack depth and flip duration, and the
//! script reproduces their stepping rules in the browser.

pub mod book;
pub mod burst;
pub mod deck;
pub mod reveal;

pub use book::{LoveBook, Page, Spread};
pub use burst::{BurstSource, Particle, burst_layout};
pub use deck::{DragOutcome, SwipeDeck, VideoState};
pub use reveal::{
    Choreography, Effect, Modal, Outcome, RevealEvent, RevealMachine, RevealState, Stage, Transition,
};
