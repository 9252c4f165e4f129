use serde::{Deserialize, Serialize};

/// The eight EXIF image orientations, numbered as in the EXIF tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageOrientation {
    Up = 1,
    UpMirrored = 2,
    Down = 3,
    DownMirrored = 4,
    LeftMirrored = 5,
    Right = 6,
    RightMirrored = 7,
    Left = 8,
}

impl ImageOrientation {
    pub fn exif_value(self) -> u8 {
        self as u8
    }

    pub fn from_exif(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Up),
            2 => Some(Self::UpMirrored),
            3 => Some(Self::Down),
            4 => Some(Self::DownMirrored),
            5 => Some(Self::LeftMirrored),
            6 => Some(Self::Right),
            7 => Some(Self::RightMirrored),
            8 => Some(Self::Left),
            _ => None,
        }
    }

    pub fn is_mirrored(self) -> bool {
        matches!(
            self,
            Self::UpMirrored | Self::DownMirrored | Self::LeftMirrored | Self::RightMirrored
        )
    }

    /// True when the stored pixels must be rotated by 90 degrees for display.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Self::LeftMirrored | Self::Right | Self::RightMirrored | Self::Left
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CameraPosition {
    #[default]
    Back,
    Front,
}

impl DeviceOrientation {
    /// Flat and unknown orientations say nothing about how the sensor is held.
    pub fn is_interface_relevant(self) -> bool {
        !matches!(self, Self::FaceUp | Self::FaceDown | Self::Unknown)
    }

    /// Orientation of the sensor image relative to how the user holds the device.
    pub fn image_orientation(self, camera: CameraPosition) -> ImageOrientation {
        match camera {
            CameraPosition::Back => match self {
                Self::PortraitUpsideDown => ImageOrientation::Left,
                Self::LandscapeLeft => ImageOrientation::Up,
                Self::LandscapeRight => ImageOrientation::Down,
                Self::Portrait | Self::FaceUp | Self::FaceDown | Self::Unknown => {
                    ImageOrientation::Right
                }
            },
            CameraPosition::Front => match self {
                Self::PortraitUpsideDown => ImageOrientation::RightMirrored,
                Self::LandscapeLeft => ImageOrientation::DownMirrored,
                Self::LandscapeRight => ImageOrientation::UpMirrored,
                Self::Portrait | Self::FaceUp | Self::FaceDown | Self::Unknown => {
                    ImageOrientation::LeftMirrored
                }
            },
        }
    }
}
