//! Names of the transactions the publication contract exposes.
//!
//! Both the registry on the ledger side and the typed client use these, so
//! a rename cannot drift between the two.

pub const INIT_LEDGER: &str = "initLedger";
pub const GET_ALL: &str = "getAll";
pub const EXISTS_BY_ID: &str = "existsById";
pub const CREATE_PUBLICATION: &str = "createPublication";
pub const UPDATE_PUBLICATION: &str = "updatePublication";
pub const DELETE_PUBLICATION: &str = "deletePublication";
pub const GET_HISTORY: &str = "getHistory";

/// Every transaction name, in registration order.
pub const ALL: [&str; 7] = [
    INIT_LEDGER,
    GET_ALL,
    EXISTS_BY_ID,
    CREATE_PUBLICATION,
    UPDATE_PUBLICATION,
    DELETE_PUBLICATION,
    GET_HISTORY,
];
