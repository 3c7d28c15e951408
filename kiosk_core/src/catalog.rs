//! Item identity, display ordering and menu metadata.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{KioskError, Result};

/// Opaque reference to a renderable mesh owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MeshHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Sphere,
    Cube,
    Cone,
    Cylinder,
}

/// What the host needs to draw an item. A mesh without one never reaches
/// the carousel.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Appearance {
    pub primitive: Primitive,
    pub color: [f32; 3],
}

impl Appearance {
    fn is_usable(&self) -> bool {
        self.color
            .iter()
            .all(|channel| channel.is_finite() && (0.0..=1.0).contains(channel))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredMesh {
    pub key: String,
    pub handle: MeshHandle,
    pub appearance: Appearance,
}

/// Meshes keyed by canonical item key, in the order the asset provider
/// discovered them.
#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    meshes: Vec<RegisteredMesh>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, appearance: Option<Appearance>) -> Result<MeshHandle> {
        if self.get(key).is_some() {
            return Err(KioskError::DuplicateItem(key.to_string()));
        }
        let appearance = appearance
            .filter(Appearance::is_usable)
            .ok_or_else(|| KioskError::MissingAppearance(key.to_string()))?;
        let handle = MeshHandle(self.meshes.len() as u32);
        self.meshes.push(RegisteredMesh {
            key: key.to_string(),
            handle,
            appearance,
        });
        Ok(handle)
    }

    pub fn get(&self, key: &str) -> Option<&RegisteredMesh> {
        self.meshes.iter().find(|mesh| mesh.key == key)
    }

    pub fn appearance(&self, handle: MeshHandle) -> Option<Appearance> {
        self.meshes
            .get(handle.0 as usize)
            .map(|mesh| mesh.appearance)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredMesh> {
        self.meshes.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub key: String,
    pub display_mesh: MeshHandle,
    pub order_index: usize,
}

/// Lays items out in `curated` order, then appends anything the curated
/// list does not mention in discovery order. Curated keys with no mesh are
/// skipped.
pub fn arrange_items(registry: &ItemRegistry, curated: &[String]) -> Result<Vec<Item>> {
    if registry.is_empty() {
        return Err(KioskError::EmptyCatalog);
    }
    let mut ordered: Vec<&RegisteredMesh> = Vec::with_capacity(registry.len());
    for key in curated {
        if let Some(mesh) = registry.get(key) {
            if !ordered.iter().any(|seen| seen.key == mesh.key) {
                ordered.push(mesh);
            }
        } else {
            log::debug!("curated item `{key}` has no mesh; skipping");
        }
    }
    for mesh in registry.iter() {
        if !ordered.iter().any(|seen| seen.key == mesh.key) {
            ordered.push(mesh);
        }
    }
    Ok(ordered
        .into_iter()
        .enumerate()
        .map(|(order_index, mesh)| Item {
            key: mesh.key.clone(),
            display_mesh: mesh.handle,
            order_index,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetaExtra {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ItemDetails {
    pub display_name: String,
    pub price: f64,
    pub calories: u32,
    #[serde(default)]
    pub extras: Vec<MetaExtra>,
}

impl ItemDetails {
    pub const FALLBACK_PRICE: f64 = 5.0;
    pub const FALLBACK_CALORIES: u32 = 400;

    fn fallback(key: &str) -> Self {
        Self {
            display_name: key.to_string(),
            price: Self::FALLBACK_PRICE,
            calories: Self::FALLBACK_CALORIES,
            extras: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct MenuFile {
    #[serde(default)]
    curated_order: Vec<String>,
    items: Vec<MenuEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct MenuEntry {
    key: String,
    #[serde(flatten)]
    details: ItemDetails,
    #[serde(default)]
    appearance: Option<Appearance>,
}

/// Display names, prices and calories by item key, plus the curated
/// display sequence and the appearance each key is drawn with.
#[derive(Debug, Clone)]
pub struct MenuCatalog {
    curated_order: Vec<String>,
    details: BTreeMap<String, ItemDetails>,
    appearances: Vec<(String, Appearance)>,
}

static DEFAULT_MENU: Lazy<MenuCatalog> = Lazy::new(|| {
    #[rustfmt::skip]
    let rows: [(&str, &str, f64, u32, Primitive, [f32; 3], &[(&str, &str)]); 9] = [
        ("burger", "Classic Burger", 8.5, 650, Primitive::Sphere, [0.78, 0.45, 0.2], &[("Protein", "32g")]),
        ("fries", "Golden Fries", 3.75, 380, Primitive::Cube, [0.98, 0.82, 0.25], &[]),
        ("hotdog", "Hot Dog", 5.25, 450, Primitive::Cylinder, [0.85, 0.35, 0.25], &[("Spice", "Mild")]),
        ("pizza", "Pizza Slice", 6.0, 520, Primitive::Cone, [0.95, 0.62, 0.3], &[]),
        ("taco", "Street Taco", 4.5, 310, Primitive::Cone, [0.9, 0.75, 0.4], &[("Spice", "Hot")]),
        ("sushi", "Sushi Roll", 9.0, 290, Primitive::Cylinder, [0.95, 0.95, 0.92], &[]),
        ("donut", "Glazed Donut", 2.5, 260, Primitive::Sphere, [0.92, 0.55, 0.7], &[]),
        ("icecream", "Soft Serve", 3.25, 210, Primitive::Cone, [0.98, 0.94, 0.85], &[]),
        ("soda", "Fountain Soda", 1.95, 150, Primitive::Cylinder, [0.35, 0.6, 0.95], &[("Size", "Large")]),
    ];
    let mut details = BTreeMap::new();
    let mut appearances = Vec::new();
    let mut curated_order = Vec::new();
    for (key, name, price, calories, primitive, color, extras) in rows {
        curated_order.push(key.to_string());
        appearances.push((key.to_string(), Appearance { primitive, color }));
        details.insert(
            key.to_string(),
            ItemDetails {
                display_name: name.to_string(),
                price,
                calories,
                extras: extras
                    .iter()
                    .map(|(label, value)| MetaExtra {
                        label: label.to_string(),
                        value: value.to_string(),
                    })
                    .collect(),
            },
        );
    }
    MenuCatalog {
        curated_order,
        details,
        appearances,
    }
});

impl Default for MenuCatalog {
    fn default() -> Self {
        DEFAULT_MENU.clone()
    }
}

impl MenuCatalog {
    pub fn from_json(data: &str, what: &str) -> Result<Self> {
        let file: MenuFile =
            serde_json::from_str(data).map_err(|source| KioskError::ConfigParse {
                what: what.to_string(),
                source,
            })?;
        let mut details = BTreeMap::new();
        let mut appearances = Vec::new();
        for entry in file.items {
            if details.contains_key(&entry.key) {
                return Err(KioskError::DuplicateItem(entry.key));
            }
            if let Some(appearance) = entry.appearance {
                appearances.push((entry.key.clone(), appearance));
            }
            details.insert(entry.key, entry.details);
        }
        Ok(Self {
            curated_order: file.curated_order,
            details,
            appearances,
        })
    }

    /// Details for `key`, or the generic record (price 5.0, 400 calories)
    /// when the key is not on the menu.
    pub fn details_by_key(&self, key: &str) -> ItemDetails {
        self.details
            .get(key)
            .cloned()
            .unwrap_or_else(|| ItemDetails::fallback(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.details.contains_key(key)
    }

    pub fn curated_order(&self) -> &[String] {
        &self.curated_order
    }

    /// Appearances declared by the menu, in menu order.
    pub fn appearances(&self) -> &[(String, Appearance)] {
        &self.appearances
    }
}
