use serde::{Deserialize, Serialize};

/// One record of a demand-update file. Endpoints accept either node ids or
/// node labels; `source`/`destination` are accepted as aliases.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DemandUpdateDto {
    #[serde(alias = "source")]
    pub src: NodeRefDto,

    #[serde(alias = "destination")]
    pub dst: NodeRefDto,

    pub required: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum NodeRefDto {
    Id(i64),
    Label(String),
}
