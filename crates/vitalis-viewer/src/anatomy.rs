//! Built-in demo body: an adult standing at the origin, Y up, metres.

use glam::Vec3;
use vitalis_geometry::{
    BodyRegion, BodySystem, DetailLevel, GeometryDescriptor, GeometryDescriptorError,
    StructureDef, StructureRegistry,
};
use vitalis_scene::{LevelContent, ReadingLevel, StaticContentProvider};

fn sphere(radius: f32) -> GeometryDescriptor {
    GeometryDescriptor::Sphere { radius }
}

fn capsule(radius: f32, length: f32) -> GeometryDescriptor {
    GeometryDescriptor::Capsule { radius, length }
}

fn cylinder(radius_top: f32, radius_bottom: f32, height: f32) -> GeometryDescriptor {
    GeometryDescriptor::Cylinder {
        radius_top,
        radius_bottom,
        height,
    }
}

fn torus(radius: f32, tube: f32) -> GeometryDescriptor {
    GeometryDescriptor::Torus { radius, tube }
}

fn scanned(triangle_counts: &[u32], bounding_radius: f32) -> GeometryDescriptor {
    GeometryDescriptor::Model {
        triangle_counts: triangle_counts.to_vec(),
        bounding_radius,
    }
}

/// Left and right copies of a paired structure, mirrored across x = 0.
fn pair(
    name: &str,
    system: BodySystem,
    regions: [BodyRegion; 2],
    geometry: GeometryDescriptor,
    right_side: Vec3,
) -> [StructureDef; 2] {
    let left_side = Vec3::new(-right_side.x, right_side.y, right_side.z);
    [
        StructureDef::new(format!("left_{name}"), system, regions[0], geometry.clone()).at(left_side),
        StructureDef::new(format!("right_{name}"), system, regions[1], geometry).at(right_side),
    ]
}

pub fn default_structures() -> Vec<StructureDef> {
    use BodyRegion::*;
    use BodySystem::*;

    let mut defs = vec![
        // Skeletal
        StructureDef::new("skull", Skeletal, Head, sphere(0.095)).at(Vec3::new(0.0, 1.66, 0.0)),
        StructureDef::new("spine", Skeletal, Thorax, cylinder(0.02, 0.025, 0.6))
            .at(Vec3::new(0.0, 1.25, -0.09)),
        StructureDef::new("pelvis", Skeletal, Pelvis, torus(0.11, 0.03)).at(Vec3::new(0.0, 0.95, 0.0)),
        // Nervous
        StructureDef::new("brain", Nervous, Head, scanned(&[60_000, 24_000, 8_000, 2_000], 0.085))
            .at(Vec3::new(0.0, 1.67, 0.0))
            .with_priority(2.0)
            .with_content("brain"),
        StructureDef::new("spinal_cord", Nervous, Neck, cylinder(0.006, 0.006, 0.25))
            .at(Vec3::new(0.0, 1.5, -0.09)),
        // Cardiovascular
        StructureDef::new("heart", Cardiovascular, Thorax, scanned(&[48_000, 18_000, 6_000, 1_200], 0.065))
            .at(Vec3::new(0.01, 1.3, 0.05))
            .with_priority(2.0)
            .with_content("heart"),
        StructureDef::new("aorta", Cardiovascular, Thorax, cylinder(0.012, 0.012, 0.35))
            .at(Vec3::new(0.0, 1.2, 0.0)),
        // Respiratory
        StructureDef::new("trachea", Respiratory, Neck, cylinder(0.01, 0.01, 0.12))
            .at(Vec3::new(0.0, 1.48, 0.02)),
        // Digestive
        StructureDef::new("stomach", Digestive, Abdomen, sphere(0.06))
            .at(Vec3::new(-0.05, 1.12, 0.04))
            .with_content("stomach"),
        StructureDef::new("liver", Digestive, Abdomen, sphere(0.08))
            .at(Vec3::new(0.07, 1.15, 0.03))
            .with_priority(1.5)
            .with_occluder_radius(0.06)
            .with_content("liver"),
        StructureDef::new("small_intestine", Digestive, Abdomen, torus(0.08, 0.025))
            .at(Vec3::new(0.0, 1.02, 0.03)),
        // Urinary
        StructureDef::new("bladder", Urinary, Pelvis, sphere(0.035)).at(Vec3::new(0.0, 0.92, 0.05)),
        // Endocrine
        StructureDef::new("thyroid", Endocrine, Neck, sphere(0.02)).at(Vec3::new(0.0, 1.47, 0.04)),
        // Lymphatic
        StructureDef::new("thymus", Lymphatic, Thorax, sphere(0.025)).at(Vec3::new(0.0, 1.38, 0.06)),
        StructureDef::new("spleen", Lymphatic, Abdomen, sphere(0.04)).at(Vec3::new(-0.1, 1.13, -0.02)),
        // Integumentary: the whole body outline, only worth drawing at medium or better.
        StructureDef::new("skin", Integumentary, Thorax, scanned(&[40_000, 16_000, 5_000, 1_000], 0.9))
            .at(Vec3::new(0.0, 0.9, 0.0))
            .with_priority(0.5)
            .with_min_level(DetailLevel::Medium),
    ];

    defs.extend(pair("femur", Skeletal, [LeftLeg, RightLeg], cylinder(0.018, 0.022, 0.45), Vec3::new(0.09, 0.68, 0.0)));
    defs.extend(pair("humerus", Skeletal, [LeftArm, RightArm], cylinder(0.015, 0.018, 0.3), Vec3::new(0.19, 1.3, 0.0)));
    defs.extend(pair("lung", Respiratory, [Thorax, Thorax], capsule(0.06, 0.12), Vec3::new(0.08, 1.32, 0.0)));
    defs.extend(pair("kidney", Urinary, [Abdomen, Abdomen], capsule(0.025, 0.05), Vec3::new(0.06, 1.08, -0.05)));
    defs.extend(pair("biceps", Muscular, [LeftArm, RightArm], capsule(0.025, 0.15), Vec3::new(0.19, 1.3, 0.03)));
    defs.extend(pair("quadriceps", Muscular, [LeftLeg, RightLeg], capsule(0.045, 0.3), Vec3::new(0.09, 0.68, 0.04)));

    for lung in defs.iter_mut().filter(|d| d.name.ends_with("_lung")) {
        lung.content_id = Some("lungs".to_string());
    }
    defs
}

pub fn default_registry() -> Result<StructureRegistry, GeometryDescriptorError> {
    StructureRegistry::from_definitions(default_structures())
}

pub fn default_content() -> StaticContentProvider {
    StaticContentProvider::new()
        .with(
            "heart",
            ReadingLevel::CHILD,
            LevelContent::new("Your heart", "A strong pump about the size of your fist.")
                .with_point("It beats around 100,000 times every day."),
        )
        .with(
            "heart",
            ReadingLevel::PATIENT,
            LevelContent::new(
                "The heart",
                "A four-chambered muscle that pumps blood through the lungs and the body.",
            )
            .with_point("The right side sends blood to the lungs.")
            .with_point("The left side sends blood to the rest of the body."),
        )
        .with(
            "heart",
            ReadingLevel::PHYSICIAN,
            LevelContent::new(
                "Cardiac cycle",
                "Atrial systole, isovolumetric contraction, ejection and diastolic filling.",
            )
            .with_point("AV valves close at the onset of ventricular systole."),
        )
        .with(
            "lungs",
            ReadingLevel::CHILD,
            LevelContent::new("Your lungs", "Two spongy bags that fill with air when you breathe in."),
        )
        .with(
            "lungs",
            ReadingLevel::PATIENT,
            LevelContent::new(
                "The lungs",
                "Oxygen passes from tiny air sacs called alveoli into the blood.",
            ),
        )
        .with(
            "brain",
            ReadingLevel::PATIENT,
            LevelContent::new("The brain", "Controls movement, senses, memory and thought."),
        )
        .with(
            "brain",
            ReadingLevel::MEDICAL_STUDENT,
            LevelContent::new(
                "Cerebrum",
                "Cortical lobes, basal ganglia and limbic structures with distinct functions.",
            ),
        )
        .with(
            "liver",
            ReadingLevel::PATIENT,
            LevelContent::new(
                "The liver",
                "Filters the blood, stores energy and makes bile for digestion.",
            ),
        )
        .with(
            "stomach",
            ReadingLevel::PATIENT,
            LevelContent::new("The stomach", "Mixes food with acid and enzymes."),
        )
}

#[cfg(test)]
mod tests {
    use vitalis_scene::ContentProvider;

    use super::*;

    #[test]
    fn test_registry_builds() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.len(), default_structures().len());
        assert!(registry.by_name("heart").is_some());
        assert!(registry.by_name("left_lung").is_some());
        assert!(registry.by_name("right_kidney").is_some());
    }

    /// Every layer toggle has something to hide.
    #[test]
    fn test_every_system_present() {
        let registry = default_registry().unwrap();
        for system in BodySystem::ALL {
            assert!(registry.in_system(system).next().is_some(), "{system:?}");
        }
    }

    /// Pairs mirror across the midline.
    #[test]
    fn test_pairs_mirror() {
        let registry = default_registry().unwrap();
        let left = registry.by_name("left_femur").unwrap();
        let right = registry.by_name("right_femur").unwrap();
        assert_eq!(left.bounds.center.x, -right.bounds.center.x);
        assert_eq!(left.region, BodyRegion::LeftLeg);
        assert_eq!(right.region, BodyRegion::RightLeg);
    }

    /// Each structure that names content has a patient-level entry.
    #[test]
    fn test_content_ids_resolve() {
        let content = default_content();
        let registry = default_registry().unwrap();
        let mut checked = 0;
        for structure in registry.iter() {
            if let Some(id) = &structure.content_id {
                assert!(
                    content.content_for_level(id, ReadingLevel::PATIENT).is_some(),
                    "{id}"
                );
                checked += 1;
            }
        }
        assert!(checked >= 5);
    }
}
