//! Declared schemas of the warehouse tables

use super::types::{FieldType, TableSchema};

/// Schema of the album tables (`albums-full-info-N`)
pub fn album_schema() -> TableSchema {
    use FieldType::{Float, String};

    TableSchema::nullable(&[
        ("_id", String),
        ("numTracks", Float),
        ("keywords", String),
        ("datePublished", String),
        ("name", String),
        ("dateModified", String),
        ("comment", String),
        ("description", String),
        ("inAlbum", Float),
        ("offers", Float),
        ("duration_secs", Float),
        ("url", String),
        ("duration", String),
        ("recordingOf", String),
        ("isrcCode", String),
        ("byArtist_image", String),
        ("byArtist_genre", String),
        ("byArtist_@id", String),
        ("byArtist_@type", String),
        ("byArtist_sameAs", String),
        ("byArtist_name", String),
        ("byArtist_description", String),
        ("track_itemListElement", String),
        ("track_@type", String),
        ("track_numberOfItems", Float),
        ("track", Float),
        ("inAlbum_name", String),
        ("inAlbum_@id", String),
        ("inAlbum_@type", String),
        ("offers_availability", String),
        ("offers_priceSpecification_minPrice", Float),
        ("offers_price", Float),
        ("offers_@type", String),
        ("offers_priceCurrency", String),
        ("offers_url", String),
        ("recordingOf_@type", String),
        ("recordingOf_lyrics_text", String),
        ("recordingOf_lyrics_@type", String),
        ("byArtist", Float),
    ])
}

/// Schema of the for-hire-vehicle trip tables
pub fn trip_schema() -> TableSchema {
    use FieldType::{Float, String, Timestamp};

    TableSchema::nullable(&[
        ("dispatching_base_num", String),
        ("pickup_datetime", Timestamp),
        ("dropOff_datetime", Timestamp),
        ("PUlocationID", Float),
        ("DOlocationID", Float),
        ("SR_Flag", Float),
        ("Affiliated_base_number", String),
    ])
}
