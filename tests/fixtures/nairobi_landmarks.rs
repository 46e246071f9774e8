//! Nairobi landmarks used as delivery reference points in tests.
//!
//! Coordinates are approximate and only informational; the planner never
//! computes distances.

use dispatch_planner::model::{Landmark, LandmarkId};

/// A named landmark with coordinates.
#[derive(Debug, Clone)]
pub struct LandmarkFixture {
    pub id: u64,
    pub name: &'static str,
    pub area: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl LandmarkFixture {
    pub const fn new(id: u64, name: &'static str, area: &'static str, lat: f64, lng: f64) -> Self {
        Self { id, name, area, lat, lng }
    }

    pub fn id(&self) -> LandmarkId {
        LandmarkId(self.id)
    }

    pub fn to_landmark(&self) -> Landmark {
        Landmark {
            id: LandmarkId(self.id),
            name: self.name.to_string(),
            area: self.area.to_string(),
            city: "Nairobi".to_string(),
            coordinates: Some((self.lat, self.lng)),
        }
    }
}

pub const SARIT_CENTRE: LandmarkFixture = LandmarkFixture::new(1, "Sarit Centre", "Westlands", -1.2610, 36.8020);
pub const YAYA_CENTRE: LandmarkFixture = LandmarkFixture::new(2, "Yaya Centre", "Kilimani", -1.2929, 36.7876);
pub const JUNCTION_MALL: LandmarkFixture = LandmarkFixture::new(3, "The Junction Mall", "Ngong Road", -1.2985, 36.7625);
pub const GARDEN_CITY: LandmarkFixture = LandmarkFixture::new(4, "Garden City Mall", "Thika Road", -1.2323, 36.8790);
pub const KENCOM: LandmarkFixture = LandmarkFixture::new(5, "Kencom House", "CBD", -1.2864, 36.8250);

pub const ALL: &[LandmarkFixture] = &[SARIT_CENTRE, YAYA_CENTRE, JUNCTION_MALL, GARDEN_CITY, KENCOM];
