// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod bopomofo;
pub mod config;
pub mod ids;
pub mod keymap;
pub mod model;
pub mod selection;
pub mod session;
pub mod state;
pub mod store;
pub mod view;

pub use config::*;
pub use ids::*;
pub use model::*;
pub use selection::*;
pub use session::*;
pub use state::*;
pub use store::*;
pub use view::*;
