//! Social network profile links.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A supported social network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialNetwork {
    Facebook,
    Instagram,
    #[serde(rename = "youtube")]
    YouTube,
}

impl SocialNetwork {
    /// Order in which form fields are validated.
    pub const FORM_ORDER: [Self; 3] = [Self::Facebook, Self::Instagram, Self::YouTube];

    /// Order in which icons appear on the public profile.
    pub const DISPLAY_ORDER: [Self; 3] = [Self::Facebook, Self::YouTube, Self::Instagram];

    /// Human-readable network name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Facebook => "Facebook",
            Self::Instagram => "Instagram",
            Self::YouTube => "YouTube",
        }
    }

    /// Stored field name, also used as the HTML form field name.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::YouTube => "youtube",
        }
    }
}

impl fmt::Display for SocialNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The singleton social links record.
///
/// Each field is a URL or empty. Fields missing from the stored document
/// read back as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    pub facebook: String,
    pub instagram: String,
    pub youtube: String,
}

impl SocialLinks {
    /// The stored URL for a network (possibly empty).
    #[must_use]
    pub fn get(&self, network: SocialNetwork) -> &str {
        match network {
            SocialNetwork::Facebook => &self.facebook,
            SocialNetwork::Instagram => &self.instagram,
            SocialNetwork::YouTube => &self.youtube,
        }
    }

    /// Networks with a non-empty URL, in display order.
    #[must_use]
    pub fn present(&self) -> Vec<(SocialNetwork, &str)> {
        SocialNetwork::DISPLAY_ORDER
            .into_iter()
            .map(|network| (network, self.get(network)))
            .filter(|(_, url)| !url.trim().is_empty())
            .collect()
    }

    /// True when no network has a URL.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present().is_empty()
    }
}

/// A partial update for [`SocialLinks`].
///
/// `None` means "leave the stored value alone"; `Some("")` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinksPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
}

impl SocialLinksPatch {
    /// The patched value for a network, if the patch touches it.
    #[must_use]
    pub fn get(&self, network: SocialNetwork) -> Option<&str> {
        match network {
            SocialNetwork::Facebook => self.facebook.as_deref(),
            SocialNetwork::Instagram => self.instagram.as_deref(),
            SocialNetwork::YouTube => self.youtube.as_deref(),
        }
    }

    /// Mutable access to a network's slot.
    pub fn slot_mut(&mut self, network: SocialNetwork) -> &mut Option<String> {
        match network {
            SocialNetwork::Facebook => &mut self.facebook,
            SocialNetwork::Instagram => &mut self.instagram,
            SocialNetwork::YouTube => &mut self.youtube,
        }
    }

    /// True when the patch touches no field.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.facebook.is_none() && self.instagram.is_none() && self.youtube.is_none()
    }
}
