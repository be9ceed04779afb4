// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod backend;
mod ledger;
mod utils;
mod wallet;

pub use backend::*;
pub use ledger::*;
pub use utils::*;
pub use wallet::*;
