use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: String,
    pub name: String,
}

/// The fixed set of barbers, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Roster(Vec<Staff>);

impl Roster {
    pub fn new(staff: Vec<Staff>) -> Self {
        Roster(staff)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Staff> {
        self.0.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Staff> {
        self.0.iter().find(|s| s.id == id)
    }

    /// Declaration index, used to order bookings that share a slot.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|s| s.id == id)
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a Staff;
    type IntoIter = std::slice::Iter<'a, Staff>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
