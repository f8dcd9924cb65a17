//! Search-space expansion: category synonyms and capital sub-areas.
//!
//! Both expanders are static lookups run once at session start; the
//! resulting [`SearchPlan`] is immutable for the rest of the session.

use mapscout_core::text::{fold_accents, normalize};
use std::collections::HashSet;

/// Maximum number of search phrases a category expands to.
pub const MAX_SEARCH_TERMS: usize = 3;

/// Canonical category -> synonyms, in priority order.
const SYNONYMS: &[(&str, &[&str])] = &[
    (
        "restaurante",
        &["restaurant", "comida", "food", "gastronomía", "cocina"],
    ),
    (
        "hotel",
        &["hospedaje", "alojamiento", "hostal", "lodge", "inn"],
    ),
    (
        "minería",
        &["mining", "minera", "mina", "extracción minera"],
    ),
    (
        "construcción",
        &["construccion", "building", "obra", "contractor"],
    ),
    ("farmacia", &["pharmacy", "botica", "drugstore"]),
    ("panadería", &["bakery", "pan", "bread", "pastelería"]),
    ("ferretería", &["hardware store", "herramientas", "tools"]),
];

/// Region whose searches fan out into districts.
const CAPITAL_REGION: &str = "lima";

/// Districts searched when the capital region is requested.
pub const CAPITAL_DISTRICTS: [&str; 32] = [
    "Lima",
    "Miraflores",
    "San Isidro",
    "Santiago de Surco",
    "La Molina",
    "San Borja",
    "Barranco",
    "San Miguel",
    "Pueblo Libre",
    "Jesus Maria",
    "Magdalena del Mar",
    "Lince",
    "Breña",
    "Rimac",
    "San Luis",
    "Chorrillos",
    "Ate",
    "Callao",
    "Los Olivos",
    "San Martin de Porres",
    "Independencia",
    "Comas",
    "Villa El Salvador",
    "Villa Maria del Triunfo",
    "San Juan de Lurigancho",
    "San Juan de Miraflores",
    "El Agustino",
    "Santa Anita",
    "La Victoria",
    "Carabayllo",
    "Puente Piedra",
    "Surquillo",
];

/// Regions offered to users; unknown regions are still searched as-is.
pub const KNOWN_REGIONS: [&str; 25] = [
    "Lima",
    "Arequipa",
    "Cusco",
    "Trujillo",
    "Chiclayo",
    "Piura",
    "Iquitos",
    "Huancayo",
    "Tacna",
    "Ica",
    "Juliaca",
    "Pucallpa",
    "Cajamarca",
    "Ayacucho",
    "Huánuco",
    "Chimbote",
    "Tarapoto",
    "Tumbes",
    "Puno",
    "Sullana",
    "Chincha Alta",
    "Huaraz",
    "Talara",
    "Jaén",
    "Abancay",
];

/// Expand a category into at most [`MAX_SEARCH_TERMS`] search phrases,
/// original first.
///
/// A category matches a synonym entry when its folded form equals the key,
/// equals one of the synonyms, or is a substring of the key. Without a match
/// the category is returned unchanged as the only term.
pub fn expand_terms(category: &str) -> Vec<String> {
    let wanted = fold_accents(category.trim());

    let entry = SYNONYMS.iter().find(|(key, synonyms)| {
        let key = fold_accents(key);
        wanted == key
            || synonyms.iter().any(|s| fold_accents(s) == wanted)
            || key.contains(&wanted)
    });

    let Some((_, synonyms)) = entry else {
        return vec![category.to_string()];
    };

    let mut seen = HashSet::new();
    std::iter::once(category.trim())
        .chain(synonyms.iter().copied())
        .filter(|term| seen.insert(fold_accents(term)))
        .take(MAX_SEARCH_TERMS)
        .map(str::to_string)
        .collect()
}

/// Expand a region into `"<area>, <region>, <country>"` location strings.
///
/// The capital expands to its districts; any other region yields the single
/// location `"<region>, <country>"`.
pub fn expand_region(region: &str, country: &str) -> Vec<String> {
    if normalize(region) == CAPITAL_REGION {
        CAPITAL_DISTRICTS
            .iter()
            .map(|district| format!("{district}, Lima, {country}"))
            .collect()
    } else {
        vec![format!("{region}, {country}")]
    }
}

/// Locations × search terms visited by one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    terms: Vec<String>,
    locations: Vec<String>,
}

impl SearchPlan {
    /// Build the plan for a request; synonym expansion is optional.
    pub fn build(category: &str, region: &str, country: &str, expand: bool) -> Self {
        let terms = if expand {
            expand_terms(category)
        } else {
            vec![category.to_string()]
        };
        Self {
            terms,
            locations: expand_region(region, country),
        }
    }

    /// Search phrases, original category first.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Location strings, visited in order.
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Number of (location, term) combinations.
    pub(crate) fn len(&self) -> usize {
        self.terms.len() * self.locations.len()
    }
}
