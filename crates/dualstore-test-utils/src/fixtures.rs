//! Fixtures

use dualstore_document::Document;
use dualstore_services::{Booking, FlightPath};

/// Parse a JSON object literal into a document
pub fn doc(json: serde_json::Value) -> Document {
    Document::from_json(json).unwrap()
}

/// Catalog row in the nested `keyspaces` shape
pub fn catalog_row(bucket: &str, scope: &str, collection: &str) -> Document {
    doc(serde_json::json!({
        "keyspaces": {"bucket": bucket, "scope": scope, "id": collection}
    }))
}

/// `count` legacy records with ids `<prefix>_<n>` and free-form field names
pub fn legacy_records(prefix: &str, count: usize) -> Vec<Document> {
    (0..count)
        .map(|n| {
            doc(serde_json::json!({
                "_id": format!("{prefix}_{n}"),
                "Flight Name": format!("AB{n:03}"),
                "Source Airport": "SFO",
                "Schedule (UTC)": [{"Day Of Week": n % 7, "Departure Time": "10:13:00"}]
            }))
        })
        .collect()
}

/// Unsaved booking for a flight
pub fn sample_booking(flight: &str) -> Booking {
    Booking {
        flight: flight.to_string(),
        price: "221.48".to_string(),
        date: "05/01/2024".to_string(),
        sourceairport: "SFO".to_string(),
        destinationairport: "LAX".to_string(),
        kind: "booking".to_string(),
        ..Booking::default()
    }
}

/// SFO to LAX routes on Sunday (day 0) and Monday (day 1)
pub fn sample_routes() -> Vec<FlightPath> {
    let route = |flight: &str, day: u32| FlightPath {
        id: Some(format!("route_{flight}")),
        name: "United Airlines".to_string(),
        airlineid: "airline_5209".to_string(),
        flight: flight.to_string(),
        day,
        utc: "11:28:00".to_string(),
        sourceairport: "SFO".to_string(),
        destinationairport: "LAX".to_string(),
        equipment: "739".to_string(),
    };
    vec![route("UA100", 0), route("UA101", 0), route("UA200", 1)]
}

/// A handful of hotels across two countries
pub fn sample_hotels() -> Vec<Document> {
    vec![
        doc(serde_json::json!({
            "name": "Medway Youth Hostel", "description": "40 bed summer hostel",
            "city": "Medway", "country": "United Kingdom", "address": "Capstone Road", "state": null
        })),
        doc(serde_json::json!({
            "name": "The Balmoral Guesthouse", "description": "Quiet guesthouse near the sea",
            "city": "Aberdeen", "country": "United Kingdom", "address": "27 Union Street"
        })),
        doc(serde_json::json!({
            "name": "Hotel du Louvre", "description": "Grand hotel opposite the museum",
            "city": "Paris", "country": "France", "address": "Place André Malraux"
        })),
    ]
}
