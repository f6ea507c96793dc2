//! Compiled-in service registry for the residential building models
//!
//! Keyword lists were calibrated against the node names of the project GLB
//! files (see `obra-glb prefixes`). Only the installation services
//! (electrical, hydro-sanitary, ducting, gas and fire suppression) override
//! the authored materials; the others keep the textures exported from the
//! modelling tool.

use crate::color::Rgb;
use crate::registry::{
    RegistryError, ServiceDefinition, ServiceRegistry, TextureProfile, DEFAULT_PROFILE,
};

fn hex(value: u32) -> Rgb {
    Rgb::from_rgb8(
        ((value >> 16) & 0xff) as u8,
        ((value >> 8) & 0xff) as u8,
        (value & 0xff) as u8,
    )
}

/// Texture profiles shipped with the viewer
pub fn builtin_profiles() -> Vec<TextureProfile> {
    vec![
        TextureProfile::new(DEFAULT_PROFILE, hex(0xcccccc), 0.8, 0.0),
        TextureProfile::new("Concreto", hex(0x9e9e9e), 0.9, 0.0),
        TextureProfile::new("Alvenaria", hex(0xb5651d), 0.85, 0.0),
        TextureProfile::new("Ceramica", hex(0xd7ccc8), 0.4, 0.0),
        TextureProfile::new("Telha", hex(0x8d3b2b), 0.7, 0.0),
        TextureProfile::new("Madeira", hex(0x8b5a2b), 0.6, 0.0),
        TextureProfile::new("Pintura", hex(0xf5f5f5), 0.9, 0.0),
        TextureProfile::new("Eletrica", hex(0xffd700), 0.4, 0.3).with_emissive(hex(0xffaa00), 0.4),
        TextureProfile::new("Hidraulica", hex(0x1e88e5), 0.3, 0.2)
            .with_emissive(hex(0x0d47a1), 0.2),
        TextureProfile::new("Dutos", hex(0xb0bec5), 0.35, 0.8),
        TextureProfile::new("Gas", hex(0xffb300), 0.4, 0.4).with_emissive(hex(0xff6f00), 0.3),
        TextureProfile::new("Incendio", hex(0xe53935), 0.4, 0.2).with_emissive(hex(0xb71c1c), 0.5),
    ]
}

/// Services in matching order
pub fn builtin_services() -> Vec<ServiceDefinition> {
    vec![
        ServiceDefinition::new(
            "Fundacao",
            hex(0x795548),
            &["Fundacao", "Sapata", "Estaca", "Baldrame"],
            "Concreto",
        ),
        ServiceDefinition::new("Estrutura", hex(0x607d8b), &["Pilar", "Viga", "Laje"], "Concreto"),
        ServiceDefinition::new(
            "Paredes Terreo",
            hex(0xff7043),
            &["ParedeTerreo", "ParedesTerreo", "AlvenariaTerreo"],
            "Alvenaria",
        ),
        ServiceDefinition::new(
            "Paredes Superior",
            hex(0xffa726),
            &["ParedeSuperior", "ParedesSuperior", "AlvenariaSuperior"],
            "Alvenaria",
        ),
        ServiceDefinition::new("Piso Terreo", hex(0x8d6e63), &["PisoTerreo"], "Ceramica"),
        ServiceDefinition::new("Piso Superior", hex(0xa1887f), &["PisoSuperior"], "Ceramica"),
        ServiceDefinition::new("Calcada", hex(0x9e9e9e), &["PisoCalcada", "Calcada"], "Concreto"),
        ServiceDefinition::new(
            "Cobertura",
            hex(0xc62828),
            &["Telhado", "Cobertura", "Cumeeira", "Calha"],
            "Telha",
        ),
        ServiceDefinition::new(
            "Esquadrias",
            hex(0x6d4c41),
            &["Janela", "Porta", "Esquadria"],
            "Madeira",
        ),
        ServiceDefinition::new(
            "Eletrica",
            hex(0xffd700),
            &["Eletric", "Tomada", "Interruptor", "Luminaria", "QuadroDistribuicao", "Conduite"],
            "Eletrica",
        )
        .overriding_material(),
        ServiceDefinition::new(
            "Hidrossanitario",
            hex(0x1e88e5),
            &["Hidrossanit", "TubulacaoAgua", "Esgoto", "CaixaDagua", "Registro", "RaloSifonado"],
            "Hidraulica",
        )
        .overriding_material(),
        ServiceDefinition::new(
            "Dutos",
            hex(0x90a4ae),
            &["Duto", "ArCondicionado", "Exaustao"],
            "Dutos",
        )
        .overriding_material(),
        ServiceDefinition::new(
            "Gas",
            hex(0xffb300),
            &["TubulacaoGas", "MedidorGas", "GasGlp"],
            "Gas",
        )
        .overriding_material(),
        ServiceDefinition::new(
            "Incendio",
            hex(0xe53935),
            &["Incendio", "Sprinkler", "Hidrante", "Extintor"],
            "Incendio",
        )
        .overriding_material(),
        ServiceDefinition::new("Pintura", hex(0xeeeeee), &["Pintura", "Revestimento"], "Pintura"),
    ]
}

/// The compiled-in registry
pub fn builtin_registry() -> Result<ServiceRegistry, RegistryError> {
    ServiceRegistry::new(builtin_services(), builtin_profiles())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_is_valid() {
        let registry = builtin_registry().unwrap();
        assert_eq!(registry.len(), 15);
        assert!(registry.keyword_overlaps().is_empty());

        // Every service resolves to its own profile, not the fallback
        for service in registry.services() {
            assert_eq!(registry.profile_for(service).name, service.texture_type);
        }
    }

    #[test]
    fn test_builtin_override_subset() {
        let registry = builtin_registry().unwrap();
        let overriding: Vec<&str> = registry
            .services()
            .iter()
            .filter(|s| s.overrides_material)
            .map(|s| s.service_name.as_str())
            .collect();

        assert_eq!(overriding, vec!["Eletrica", "Hidrossanitario", "Dutos", "Gas", "Incendio"]);
    }

    #[test]
    fn test_builtin_classification() {
        let registry = builtin_registry().unwrap();
        let classify = |name: &str| registry.classify(name).map(|s| s.service_name.clone());

        assert_eq!(classify("PisoTerreo_001").as_deref(), Some("Piso Terreo"));
        assert_eq!(classify("PisoCalcada_003").as_deref(), Some("Calcada"));
        assert_eq!(classify("ParedeTerreo_Norte").as_deref(), Some("Paredes Terreo"));
        assert_eq!(classify("TOMADA_2P_10A").as_deref(), Some("Eletrica"));
        assert_eq!(classify("TubulacaoGas_Cozinha").as_deref(), Some("Gas"));
        assert_eq!(classify("Hidrante_01").as_deref(), Some("Incendio"));
        assert_eq!(classify("Mobilia_Sofa"), None);
    }
}
