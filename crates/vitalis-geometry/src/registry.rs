//! The static, read-only structure registry.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cache::LodGeneratorCache;
use crate::error::GeometryDescriptorError;
use crate::structure::{AnatomicalStructure, BodyRegion, BodySystem, StructureDef, StructureId};

/// On-disk layout of a registry file.
#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    structures: Vec<StructureDef>,
}

/// All authored structures, indexed by id and name.
///
/// Built once at startup; every definition is validated here so per-frame code can
/// assume well-formed data.
#[derive(Debug, Default)]
pub struct StructureRegistry {
    structures: Vec<AnatomicalStructure>,
    by_name: FxHashMap<String, StructureId>,
}

impl StructureRegistry {
    /// Validate `definitions` and build the registry. Structures with identical
    /// geometry share one generated LOD chain.
    pub fn from_definitions(
        definitions: Vec<StructureDef>,
    ) -> Result<Self, GeometryDescriptorError> {
        let mut cache = LodGeneratorCache::new();
        let mut structures = Vec::with_capacity(definitions.len());
        let mut by_name = FxHashMap::default();

        for def in definitions {
            def.geometry.validate(&def.name)?;
            if !def.priority.is_finite() || def.priority < 0.0 {
                return Err(GeometryDescriptorError::InvalidPriority {
                    name: def.name,
                    value: def.priority,
                });
            }
            if let Some(radius) = def.occluder_radius
                && !(radius.is_finite() && radius > 0.0)
            {
                return Err(GeometryDescriptorError::InvalidDimension {
                    name: def.name,
                    field: "occluder_radius",
                    value: radius,
                });
            }

            let id = StructureId(structures.len() as u32);
            if by_name.insert(def.name.clone(), id).is_some() {
                return Err(GeometryDescriptorError::DuplicateName(def.name));
            }
            let chain = cache.get_or_generate(&def.geometry);
            structures.push(AnatomicalStructure::from_def(id, def, chain));
        }

        let (hits, misses) = cache.stats();
        tracing::info!(
            structures = structures.len(),
            lod_chains = misses,
            shared = hits,
            "structure registry loaded"
        );

        Ok(Self {
            structures,
            by_name,
        })
    }

    /// Parse a RON registry file of the form `(structures: [ ... ])`.
    pub fn from_ron_str(source: &str) -> Result<Self, GeometryDescriptorError> {
        let file: RegistryFile = ron::from_str(source).map_err(GeometryDescriptorError::Parse)?;
        Self::from_definitions(file.structures)
    }

    pub fn get(&self, id: StructureId) -> Option<&AnatomicalStructure> {
        self.structures.get(id.0 as usize)
    }

    pub fn by_name(&self, name: &str) -> Option<&AnatomicalStructure> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnatomicalStructure> {
        self.structures.iter()
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    pub fn in_system(&self, system: BodySystem) -> impl Iterator<Item = &AnatomicalStructure> {
        self.structures.iter().filter(move |s| s.system == system)
    }

    pub fn in_region(&self, region: BodyRegion) -> impl Iterator<Item = &AnatomicalStructure> {
        self.structures.iter().filter(move |s| s.region == region)
    }
}
