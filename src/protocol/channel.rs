//! Transport channels and the seven non-empty combinations of them.

use std::fmt;

use crate::error::Error;

/// One HTTP field a canary can travel in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// The `X-Specht` header
    Header,
    /// A `Specht=<value>` cookie
    Cookie,
    /// The raw message body
    Body,
}

impl Channel {
    /// All channels in probing order.
    pub const ALL: [Channel; 3] = [Channel::Header, Channel::Cookie, Channel::Body];

    const fn bit(self) -> u8 {
        match self {
            Channel::Header => 0b001,
            Channel::Cookie => 0b010,
            Channel::Body => 0b100,
        }
    }

    /// Lower-case name, also used as the `GET /v1/data` query flag.
    pub const fn name(self) -> &'static str {
        match self {
            Channel::Header => "header",
            Channel::Cookie => "cookie",
            Channel::Body => "body",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A non-empty subset of {header, cookie, body}.
///
/// Only the seven values in [`ChannelSet::ALL`] can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelSet(u8);

impl ChannelSet {
    /// Header only
    pub const HEADER: ChannelSet = ChannelSet(0b001);
    /// Cookie only
    pub const COOKIE: ChannelSet = ChannelSet(0b010);
    /// Header and cookie
    pub const HEADER_COOKIE: ChannelSet = ChannelSet(0b011);
    /// Body only
    pub const BODY: ChannelSet = ChannelSet(0b100);
    /// Header and body
    pub const HEADER_BODY: ChannelSet = ChannelSet(0b101);
    /// Cookie and body
    pub const COOKIE_BODY: ChannelSet = ChannelSet(0b110);
    /// Every channel at once
    pub const EVERYTHING: ChannelSet = ChannelSet(0b111);

    /// Every channel set, in ascending mask order.
    pub const ALL: [ChannelSet; 7] = [
        Self::HEADER,
        Self::COOKIE,
        Self::HEADER_COOKIE,
        Self::BODY,
        Self::HEADER_BODY,
        Self::COOKIE_BODY,
        Self::EVERYTHING,
    ];

    /// Build a set from individual channels. `None` if empty.
    pub fn from_channels(channels: impl IntoIterator<Item = Channel>) -> Option<Self> {
        let mask = channels.into_iter().fold(0u8, |m, c| m | c.bit());
        (mask != 0).then_some(Self(mask))
    }

    /// The 3-bit mask, 1 through 7.
    pub fn mask(self) -> u8 {
        self.0
    }

    /// Whether `channel` is part of this set.
    pub fn contains(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    /// Channels in this set, in header, cookie, body order.
    pub fn channels(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl TryFrom<u8> for ChannelSet {
    type Error = Error;

    fn try_from(mask: u8) -> Result<Self, Self::Error> {
        match mask {
            1..=7 => Ok(Self(mask)),
            _ => Err(Error::protocol(format!("invalid channel mask {}", mask))),
        }
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("xfer< ")?;
        for channel in self.channels() {
            write!(f, "{} ", channel)?;
        }
        f.write_str(">")
    }
}
