use serde::{Deserialize, Serialize};

/// Routes file: direction-explicit precomputed paths.
///
/// ```json
/// { "routes": [ { "src": 0, "dst": 1, "paths": [[0, 2], [4, 5]] } ] }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RoutesFileDto {
    pub routes: Vec<RouteEntryDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RouteEntryDto {
    pub src: i64,
    pub dst: i64,

    /// Each path is a sequence of link ids.
    pub paths: Vec<Vec<i64>>,
}
