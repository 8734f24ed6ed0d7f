//! Info tables for the runtime's own closure and frame types.

use super::info::{ClosureKind, InfoTable};
use crate::object::closure::tso;

pub static IND: InfoTable = InfoTable::new(ClosureKind::Ind, "stg_IND").with_layout(1, 0);

pub static PAP: InfoTable = InfoTable::new(ClosureKind::Pap, "stg_PAP");
pub static AP: InfoTable = InfoTable::new(ClosureKind::Ap, "stg_AP");
pub static AP_STACK: InfoTable = InfoTable::new(ClosureKind::ApStack, "stg_AP_STACK");

pub static MUT_VAR_CLEAN: InfoTable =
    InfoTable::new(ClosureKind::MutVarClean, "stg_MUT_VAR_CLEAN").with_layout(1, 0);
pub static MUT_VAR_DIRTY: InfoTable =
    InfoTable::new(ClosureKind::MutVarDirty, "stg_MUT_VAR_DIRTY").with_layout(1, 0);

pub static MUT_ARR_PTRS_CLEAN: InfoTable =
    InfoTable::new(ClosureKind::MutArrPtrsClean, "stg_MUT_ARR_PTRS_CLEAN");
pub static MUT_ARR_PTRS_DIRTY: InfoTable =
    InfoTable::new(ClosureKind::MutArrPtrsDirty, "stg_MUT_ARR_PTRS_DIRTY");

pub static ARR_WORDS: InfoTable = InfoTable::new(ClosureKind::ArrWords, "stg_ARR_WORDS");

pub static TSO: InfoTable = InfoTable::new(ClosureKind::Tso, "stg_TSO")
    .with_layout(5, (tso::WORDS - 6) as u32);
pub static STACK: InfoTable = InfoTable::new(ClosureKind::Stack, "stg_STACK");

pub static UPDATE_FRAME: InfoTable =
    InfoTable::new(ClosureKind::UpdateFrame, "stg_upd_frame").with_layout(1, 0);
pub static UNDERFLOW_FRAME: InfoTable =
    InfoTable::new(ClosureKind::UnderflowFrame, "stg_stack_underflow_frame").with_layout(1, 0);
pub static STOP_FRAME: InfoTable = InfoTable::new(ClosureKind::StopFrame, "stg_stop_thread");

/// Header word for a mutable variable in the given state.
pub fn mut_var(dirty: bool) -> &'static InfoTable {
    if dirty {
        &MUT_VAR_DIRTY
    } else {
        &MUT_VAR_CLEAN
    }
}

/// Header word for a mutable array in the given state.
pub fn mut_arr_ptrs(dirty: bool) -> &'static InfoTable {
    if dirty {
        &MUT_ARR_PTRS_DIRTY
    } else {
        &MUT_ARR_PTRS_CLEAN
    }
}
