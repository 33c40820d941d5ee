// This file is part of QUERCIA.
//
// Copyright (C) 2021 Affidaty Spa.
//
// QUERCIA is free software: you can redistribute it and/or modify it under
// the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// QUERCIA is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with QUERCIA. If not, see <https://www.gnu.org/licenses/>.

//! Common structures and helpers shared by the whole library.

pub mod schema;
pub mod serialize;

pub use schema::{Block, BlockData, BlockSummaryData, TransactionData, TransactionPayload};

/// Mutex type used by the library.
pub type Mutex<T> = parking_lot::Mutex<T>;

/// RwLock type used by the library.
pub type RwLock<T> = parking_lot::RwLock<T>;
