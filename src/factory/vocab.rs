//! Word lists and text helpers for synthetic names, codes and contact details

use rand::seq::SliceRandom;
use rand::Rng;

pub const FIRST_NAMES: [&str; 40] = [
    "Alice", "Bob", "Carlos", "Diana", "Elena",
    "Frank", "Grace", "Hiro", "Isha", "Jake",
    "Kenji", "Luna", "Miguel", "Nina", "Oscar",
    "Priya", "Qian", "Rafael", "Sara", "Tomasz",
    "Uma", "Viktor", "Wendy", "Xavier", "Yuki",
    "Zara", "Aiden", "Bianca", "Chloe", "Derek",
    "Elias", "Fatima", "Gavin", "Hannah", "Ivan",
    "Jasmine", "Kai", "Lena", "Mateo", "Nadia",
];

pub const LAST_NAMES: [&str; 40] = [
    "Chen", "Patel", "Kim", "Nguyen", "Garcia",
    "Muller", "Tanaka", "Singh", "Okonkwo", "Williams",
    "Johansson", "Rossi", "Fernandez", "Kowalski", "Sato",
    "Ali", "Larsen", "Dubois", "Schmidt", "Park",
    "Jensen", "Costa", "Ito", "Bakker", "Novak",
    "Shah", "Rivera", "Yamamoto", "Andersen", "Gupta",
    "Mendez", "Petrov", "Suzuki", "Eriksson", "Torres",
    "Nakamura", "Lund", "Ortiz", "Hoffmann", "Reyes",
];

const COMPANY_STEMS: [&str; 24] = [
    "Northbridge", "Harbor", "Meridian", "Summit", "Blackwater",
    "Crescent", "Ironwood", "Lakeshore", "Pinnacle", "Redstone",
    "Silverline", "Granite", "Beacon", "Oakmont", "Westgate",
    "Evergreen", "Keystone", "Bluefin", "Aldridge", "Sterling",
    "Cobalt", "Falcon", "Horizon", "Juniper",
];

const COMPANY_SUFFIXES: [&str; 10] = [
    "Capital", "Holdings", "Partners", "Bank", "Group",
    "Trust", "Securities", "Financial", "Advisors", "Asset Management",
];

/// ISO 3166 alpha-2 codes with a representative IANA time zone
pub const COUNTRIES: [(&str, &str); 20] = [
    ("US", "America/New_York"),
    ("GB", "Europe/London"),
    ("DE", "Europe/Berlin"),
    ("FR", "Europe/Paris"),
    ("CH", "Europe/Zurich"),
    ("NL", "Europe/Amsterdam"),
    ("LU", "Europe/Luxembourg"),
    ("IE", "Europe/Dublin"),
    ("JP", "Asia/Tokyo"),
    ("SG", "Asia/Singapore"),
    ("HK", "Asia/Hong_Kong"),
    ("AU", "Australia/Sydney"),
    ("CA", "America/Toronto"),
    ("KY", "America/Cayman"),
    ("BM", "Atlantic/Bermuda"),
    ("AE", "Asia/Dubai"),
    ("BR", "America/Sao_Paulo"),
    ("ZA", "Africa/Johannesburg"),
    ("IN", "Asia/Kolkata"),
    ("SE", "Europe/Stockholm"),
];

const CITIES: [&str; 16] = [
    "Springfield", "Riverton", "Fairview", "Lakewood", "Georgetown",
    "Ashford", "Brookside", "Clearwater", "Kingsport", "Millbrook",
    "Newhaven", "Portland", "Rosewood", "Stonebridge", "Westbury",
    "Yorktown",
];

const STREETS: [&str; 12] = [
    "Main", "Market", "King", "Queen", "Harbour", "Park",
    "Church", "Station", "Victoria", "High", "Bridge", "Mill",
];

const STREET_TYPES: [&str; 6] = ["Street", "Avenue", "Road", "Lane", "Boulevard", "Way"];

const REGIONS: [&str; 10] = [
    "North", "South", "East", "West", "Central",
    "Capital", "Coastal", "Highland", "Lowland", "Metro",
];

const BUZZWORDS: [&str; 12] = [
    "ownership structure", "source of funds", "transaction pattern", "jurisdictional exposure",
    "screening result", "beneficial ownership", "sanctions list", "adverse media",
    "onboarding file", "correspondent activity", "account activity", "control structure",
];

/// Uniform pick from a non-empty list
pub fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// Replaces `#` with a digit and `?` with an uppercase letter
pub fn bothify<R: Rng + ?Sized>(rng: &mut R, pattern: &str) -> String {
    pattern
        .chars()
        .map(|c| match c {
            '#' => char::from(b'0' + rng.gen_range(0..10u8)),
            '?' => char::from(b'A' + rng.gen_range(0..26u8)),
            other => other,
        })
        .collect()
}

pub fn person_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, &FIRST_NAMES), pick(rng, &LAST_NAMES))
}

pub fn company_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, &COMPANY_STEMS), pick(rng, &COMPANY_SUFFIXES))
}

pub fn country_code<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    COUNTRIES.choose(rng).map(|(code, _)| *code).unwrap_or("US")
}

pub fn timezone_for(country: &str) -> &'static str {
    COUNTRIES
        .iter()
        .find(|(code, _)| *code == country)
        .map(|(_, tz)| *tz)
        .unwrap_or("UTC")
}

pub fn city<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, &CITIES)
}

pub fn region<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, &REGIONS)
}

pub fn street_address<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{} {} {}",
        rng.gen_range(1..=9999),
        pick(rng, &STREETS),
        pick(rng, &STREET_TYPES)
    )
}

pub fn secondary_address<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("Suite {}", rng.gen_range(100..=999))
}

/// Lowercase alphanumeric slug of a company name, used for domains
pub fn slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

pub fn email(person: &str, domain: &str) -> String {
    let local = person
        .split_whitespace()
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(".");
    format!("{}@{}", local, domain)
}

pub fn phone_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    bothify(rng, "+1-###-###-####")
}

/// Short free-text sentence
pub fn sentence<R: Rng + ?Sized>(rng: &mut R, verb: &str) -> String {
    format!(
        "{} {} {} for {}.",
        pick(rng, &["Reviewed", "Confirmed", "Escalated", "Documented"]),
        verb,
        pick(rng, &BUZZWORDS),
        pick(rng, &BUZZWORDS)
    )
}
