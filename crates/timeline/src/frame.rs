use formats::{Gender, PointRecord};

/// A named slice of the dataset that the timeline steps through.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Frame {
    Men,
    Women,
    All,
}

impl Frame {
    /// Playback order.
    pub const ALL: [Frame; 3] = [Frame::Men, Frame::Women, Frame::All];

    pub fn index(self) -> usize {
        match self {
            Frame::Men => 0,
            Frame::Women => 1,
            Frame::All => 2,
        }
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// The frame auto-play moves to after this one.
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn label(self) -> &'static str {
        match self {
            Frame::Men => "Men",
            Frame::Women => "Women",
            Frame::All => "All",
        }
    }

    pub fn matches(self, record: &PointRecord) -> bool {
        match self {
            Frame::Men => record.gender == Gender::Male,
            Frame::Women => record.gender == Gender::Female,
            Frame::All => true,
        }
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Frame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "men" | "m" => Ok(Frame::Men),
            "women" | "f" | "w" => Ok(Frame::Women),
            "all" => Ok(Frame::All),
            other => Err(format!("unknown frame: {other} (expected men, women or all)")),
        }
    }
}

/// Records visible in `frame`, in dataset order.
pub fn frame_subset(records: &[PointRecord], frame: Frame) -> Vec<PointRecord> {
    records.iter().filter(|r| frame.matches(r)).copied().collect()
}
