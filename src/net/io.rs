//! I/O 支持：网络描述的 JSON / RON 序列化接口。
//!
//! 描述只是库所、变迁、弧三张列表的 serde 派生形式，
//! 通过 [`NetDescription::into_network`] 经带检查的构造接口转换为 [`Network`]。
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::net::core::{NetError, Network};
use crate::net::ids::NodeId;
use crate::net::structure::{Tokens, Weight};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid network: {0}")]
    Net(#[from] NetError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDescription {
    pub id: NodeId,
    #[serde(default)]
    pub tokens: Tokens,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDescription {
    pub id: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcDescription {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default = "default_weight")]
    pub weight: Weight,
}

fn default_weight() -> Weight {
    1
}

/// Plain place/transition/arc lists describing a network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetDescription {
    #[serde(default)]
    pub places: Vec<PlaceDescription>,
    #[serde(default)]
    pub transitions: Vec<TransitionDescription>,
    #[serde(default)]
    pub arcs: Vec<ArcDescription>,
    /// Designated initial place, checked by the verification gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_place: Option<NodeId>,
}

impl NetDescription {
    /// Places first, then transitions, then arcs in list order.
    pub fn into_network(&self) -> Result<Network, NetError> {
        let mut net = Network::new();
        for place in &self.places {
            net.add_place(place.id.clone(), place.tokens)?;
        }
        for transition in &self.transitions {
            net.add_transition(transition.id.clone())?;
        }
        for arc in &self.arcs {
            net.add_arc(arc.from.clone(), arc.to.clone(), arc.weight)?;
        }
        Ok(net)
    }

    pub fn from_network(net: &Network) -> Self {
        Self {
            places: net
                .places()
                .map(|(id, node)| PlaceDescription {
                    id: id.clone(),
                    tokens: node.tokens,
                })
                .collect(),
            transitions: net
                .transitions()
                .map(|(id, _)| TransitionDescription { id: id.clone() })
                .collect(),
            arcs: net
                .arcs()
                .map(|arc| ArcDescription {
                    from: arc.source,
                    to: arc.target,
                    weight: arc.weight,
                })
                .collect(),
            initial_place: None,
        }
    }
}

pub fn to_json_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_str(s)?)
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let mut file = File::create(path)?;
    let content = to_json_string(value)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn read_json<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    from_json_str(&content)
}

pub fn to_ron_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    let mut pretty = PrettyConfig::default();
    pretty.new_line = "\n".into();
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn from_ron_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(ron::from_str(s)?)
}

pub fn write_ron<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let mut file = File::create(path)?;
    let content = to_ron_string(value)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn read_ron<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    from_ron_str(&content)
}

/// Reads a description, picking RON for `.ron` files and JSON otherwise.
pub fn read_description<P: AsRef<Path>>(path: P) -> Result<NetDescription, IoError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ron") => read_ron(path),
        _ => read_json(path),
    }
}
