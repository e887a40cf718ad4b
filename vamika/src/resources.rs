//! Fixed catalog of helplines, safety guides and nearby safe spots.

use crate::api_client::types::{Helpline, SafeSpot, SafeSpotKind, SafetyGuide};

pub fn helplines() -> Vec<Helpline> {
    [
        (
            "National Women's Helpline",
            "1-800-799-7233",
            "24/7 crisis intervention, safety planning, and referral service for women experiencing domestic violence.",
        ),
        (
            "Crisis Text Line",
            "Text HOME to 741741",
            "Free 24/7 support for people in crisis via text message.",
        ),
        (
            "Sexual Assault Hotline",
            "1-800-656-4673",
            "Confidential support for survivors of sexual assault and their loved ones.",
        ),
        (
            "Local Police Department",
            "911",
            "For immediate emergency assistance.",
        ),
    ]
    .into_iter()
    .map(|(name, phone, description)| Helpline {
        name: name.into(),
        phone: phone.into(),
        description: description.into(),
        hours: "24/7".into(),
    })
    .collect()
}

pub fn safety_guides() -> Vec<SafetyGuide> {
    vec![
        SafetyGuide {
            id: 1,
            title: "Personal Safety Tips".into(),
            summary: "Essential tips to stay safe in public spaces.".into(),
            content: "\
• Be aware of your surroundings at all times
• Keep your phone charged and accessible
• Share your location with trusted contacts when traveling
• Trust your instincts
• Stay in well-lit areas when possible
• Consider taking a self-defense class"
                .into(),
        },
        SafetyGuide {
            id: 2,
            title: "How to Use the SOS Feature".into(),
            summary: "Quick guide for using Vamika's emergency features.".into(),
            content: "\
1. Trigger SOS from the dashboard or run `vamika-cli sos`
2. You'll have 3 seconds to cancel before your contacts are alerted
3. Your emergency contacts will receive your location
4. Trigger SOS again during the countdown to cancel it"
                .into(),
        },
        SafetyGuide {
            id: 3,
            title: "Creating a Safety Plan".into(),
            summary: "Steps to create your personalized safety strategy.".into(),
            content: "\
A safety plan includes:
• Emergency contacts list
• Safe locations in your area
• Essential items to keep accessible
• Memorized phone numbers
• Planned escape routes
• Code words to use with trusted friends"
                .into(),
        },
    ]
}

pub fn safe_spots() -> Vec<SafeSpot> {
    [
        (1, "Central Police Station", SafeSpotKind::Police, 4.5, "0.8 miles", "123 Safety Ave, Downtown"),
        (2, "City General Hospital", SafeSpotKind::Hospital, 4.8, "1.2 miles", "456 Health Blvd, Midtown"),
        (3, "Women's Shelter", SafeSpotKind::Shelter, 4.7, "1.5 miles", "789 Support St, Eastside"),
        (4, "SafeCafe Coffee Shop", SafeSpotKind::SafeBusiness, 4.2, "0.3 miles", "101 Main St, Downtown"),
        (5, "Riverside Police Department", SafeSpotKind::Police, 4.4, "2.1 miles", "202 River Road, Westside"),
    ]
    .into_iter()
    .map(|(id, name, kind, rating, distance, address)| SafeSpot {
        id,
        name: name.into(),
        kind,
        rating,
        distance: distance.into(),
        address: address.into(),
    })
    .collect()
}

/// Safe spots whose name, address or kind contains `query`, ignoring
/// case. An empty query matches everything.
pub fn search_safe_spots(query: &str) -> Vec<SafeSpot> {
    let query = query.trim().to_lowercase();
    safe_spots()
        .into_iter()
        .filter(|spot| {
            query.is_empty()
                || spot.name.to_lowercase().contains(&query)
                || spot.address.to_lowercase().contains(&query)
                || spot.kind.to_string().contains(&query)
        })
        .collect()
}

/// Digits to dial for a displayed phone string, e.g. "1-800-799-7233"
/// becomes "18007997233" and "Text HOME to 741741" becomes "741741".
pub fn dial_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}
