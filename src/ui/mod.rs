//! Widgets for the desktop front end.

pub mod piano;
pub mod results_table;

use std::fmt;

use eartrainer::session::{TEST_ALL, TEST_I_IV_V, TEST_I_TO_VII, TEST_SHARPED};

/// Degree selections offered in the pool pick_list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegreePreset {
    OneFourFive,
    Diatonic,
    Sharped,
    All,
}

impl DegreePreset {
    pub const ALL: [DegreePreset; 4] = [
        DegreePreset::OneFourFive,
        DegreePreset::Diatonic,
        DegreePreset::Sharped,
        DegreePreset::All,
    ];

    pub fn degrees(&self) -> Vec<i32> {
        let degrees: &[u8] = match self {
            DegreePreset::OneFourFive => &TEST_I_IV_V,
            DegreePreset::Diatonic => &TEST_I_TO_VII,
            DegreePreset::Sharped => &TEST_SHARPED,
            DegreePreset::All => &TEST_ALL,
        };
        degrees.iter().map(|&d| d as i32).collect()
    }

    /// The preset matching a configured pool, if any.
    pub fn matching(pool: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|p| {
            p.degrees()
                .iter()
                .map(|&d| d as u8)
                .eq(pool.iter().copied())
        })
    }
}

impl fmt::Display for DegreePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DegreePreset::OneFourFive => "I, IV, V",
            DegreePreset::Diatonic => "I to VII",
            DegreePreset::Sharped => "Sharps",
            DegreePreset::All => "All twelve",
        };
        write!(f, "{}", name)
    }
}
