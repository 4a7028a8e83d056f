// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{FilteredView, MasterIndex};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Unselected,
    Selected(MasterIndex),
}

impl Selection {
    pub const fn index(self) -> Option<MasterIndex> {
        match self {
            Self::Unselected => None,
            Self::Selected(index) => Some(index),
        }
    }

    pub const fn is_selected(self) -> bool {
        matches!(self, Self::Selected(_))
    }

    /// Resolves a row of `view` to its master index. Rows outside the view
    /// leave the selection as it was.
    pub fn pick(&mut self, view: &FilteredView, row: usize) -> bool {
        match view.master_index_at(row) {
            Some(index) => {
                *self = Self::Selected(index);
                true
            }
            None => false,
        }
    }

    pub fn select(&mut self, index: MasterIndex) {
        *self = Self::Selected(index);
    }

    pub fn clear(&mut self) {
        *self = Self::Unselected;
    }
}
