pub mod cell;
pub mod column;
pub mod controller;
pub mod edit;
pub mod error;
pub mod events;
pub mod store;
pub mod style;
pub mod trace;
pub mod value;
pub mod viewport;

pub use cell::Cell;
pub use column::{Alignment, Column, ValueKind};
pub use controller::{
    Activation, Damage, DisplayCell, DisplayModel, EditorState, GridController, GridOptions, HeaderCell,
    InputEvent, Navigation, Renderer, Response, ViewportChange,
};
pub use edit::{EditKey, EditSession, EditState};
pub use error::{GridError, Result};
pub use events::{StoreCallback, StoreEvent};
pub use store::CellStore;
pub use style::{Mode, Precedence, ResolvedStyle, RuleMode, StyleResolver, StyleRule, Variable};
pub use value::Value;
pub use viewport::{Size, ViewportComputer, ViewportState, VisibleRange, VisibleWindow};
