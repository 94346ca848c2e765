//! Built-in list of well-known places, used when every live source comes back empty.

use once_cell::sync::Lazy;

use crate::models::{GeoPoint, LocationSuggestion, SuggestionOrigin};

use super::merge_unique;

const REGION_LABEL: &str = "Bangalore, India";

struct Place {
    name: &'static str,
    lat: f64,
    lng: f64,
}

const fn place(name: &'static str, lat: f64, lng: f64) -> Place {
    Place { name, lat, lng }
}

const PLACES: &[Place] = &[
    // Neighbourhoods
    place("Koramangala", 12.9349, 77.6055),
    place("Indiranagar", 12.9789, 77.6416),
    place("Whitefield", 12.9699, 77.7499),
    place("Electronic City", 12.8458, 77.6658),
    place("Marathahalli", 12.9581, 77.7014),
    place("HSR Layout", 12.9141, 77.6422),
    place("JP Nagar", 12.9069, 77.5858),
    place("Banashankari", 12.9245, 77.5575),
    place("Jayanagar", 12.9245, 77.5575),
    place("Basavanagudi", 12.9416, 77.5676),
    place("Malleswaram", 13.0067, 77.5707),
    place("Rajajinagar", 12.9914, 77.5511),
    place("Yeshwanthpur", 13.0222, 77.5568),
    place("Hebbal", 13.0507, 77.5908),
    place("Yelahanka", 13.1007, 77.5963),
    place("Bellandur", 12.9349, 77.6954),
    place("Domlur", 12.9667, 77.6333),
    place("Frazer Town", 12.9833, 77.6167),
    place("MG Road", 12.9754, 77.6161),
    place("Brigade Road", 12.9754, 77.6161),
    place("Commercial Street", 12.9754, 77.6161),
    place("Majestic", 12.9754, 77.6161),
    // Transport
    place("Kempegowda International Airport", 13.1986, 77.7066),
    place("Bangalore City Railway Station", 12.9770, 77.5683),
    place("Yeshwanthpur Railway Station", 13.0222, 77.5568),
    place("Krishnarajapuram Railway Station", 12.9951, 77.6990),
    place("Majestic Metro Station", 12.9754, 77.6161),
    place("Indiranagar Metro Station", 12.9789, 77.6416),
    // Landmarks
    place("Cubbon Park", 12.9762, 77.6033),
    place("Lalbagh Botanical Garden", 12.9507, 77.5848),
    place("Bangalore Palace", 12.9980, 77.5925),
    place("Vidhana Soudha", 12.9791, 77.5913),
    place("ISKCON Temple", 12.9349, 77.6055),
    place("Bull Temple", 12.9416, 77.5676),
    place("Bannerghatta National Park", 12.8000, 77.5767),
    // Shopping, work and study
    place("Phoenix MarketCity", 12.9349, 77.6055),
    place("Forum Koramangala", 12.9349, 77.6055),
    place("UB City", 12.9754, 77.6161),
    place("Manyata Tech Park", 13.0507, 77.5908),
    place("Embassy Tech Village", 12.9349, 77.6954),
    place("Indian Institute of Science", 13.0203, 77.5589),
    place("Christ University", 12.9349, 77.6055),
    place("Koramangala Food Street", 12.9349, 77.6055),
];

static LOWERCASE_NAMES: Lazy<Vec<String>> =
    Lazy::new(|| PLACES.iter().map(|place| place.name.to_lowercase()).collect());

/// Case-insensitive substring match over the built-in places.
///
/// Ids are `fallback_{n}`, numbered in match order.
pub fn lookup(query: &str) -> Vec<LocationSuggestion> {
    let needle = query.trim().to_lowercase();
    let matches = PLACES
        .iter()
        .zip(LOWERCASE_NAMES.iter())
        .filter(|(_, lowercase)| lowercase.contains(&needle))
        .enumerate()
        .map(|(index, (place, _))| LocationSuggestion {
            place_id: format!("fallback_{index}"),
            label: place.name.to_string(),
            secondary_label: REGION_LABEL.to_string(),
            coordinates: Some(GeoPoint::new(place.lat, place.lng)),
            origin: SuggestionOrigin::Gazetteer,
            source_metadata: None,
        });
    merge_unique(matches)
}
