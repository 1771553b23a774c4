//! Data channel selection
//!
//! Implements channel selection algorithm #1: every connection event moves
//! `hop` channels further, modulo 37. When that lands on a channel the peer
//! marked unused, it is remapped onto the list of used channels.
//!
//! The 37 possible outcomes are computed once per channel map, so looking up
//! the channel of a connection event is a table read.

use core::fmt;

use heapless::Vec;

use crate::config::channels::{
    CHANNEL_MAP_SIZE, DATA_CHANNEL_COUNT, LAST_BYTE_MASK, MAX_HOP_INCREMENT, MIN_HOP_INCREMENT, MIN_USED_CHANNELS,
};

/// Errors reported when configuring a [`ChannelSelector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMapError {
    /// Hop increment outside of `5..=16`
    InvalidHopIncrement(u8),
    /// Fewer than two channels are marked used
    TooFewChannels(usize),
}

impl fmt::Display for ChannelMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHopIncrement(hop) => write!(f, "invalid hop increment {}", hop),
            Self::TooFewChannels(count) => write!(f, "only {} used channels", count),
        }
    }
}

/// 37 bit map of the data channels in use, as carried in connection requests
///
/// Bit `n` (little-endian bit order over the 5 bytes) marks data channel `n`.
/// The three most significant bits are reserved and never reported as channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap([u8; CHANNEL_MAP_SIZE]);

impl ChannelMap {
    /// Every data channel in use
    pub const ALL: Self = Self([0xff, 0xff, 0xff, 0xff, LAST_BYTE_MASK]);

    pub const fn from_bytes(bytes: [u8; CHANNEL_MAP_SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(&self) -> [u8; CHANNEL_MAP_SIZE] {
        self.0
    }

    pub fn contains(&self, channel: u8) -> bool {
        let channel = usize::from(channel);
        channel < DATA_CHANNEL_COUNT && self.0[channel / 8] & (1 << (channel % 8)) != 0
    }

    /// Number of used channels
    pub fn count(&self) -> usize {
        self.channels().count()
    }

    /// Used channels in ascending order
    pub fn channels(&self) -> impl Iterator<Item = u8> + '_ {
        (0..DATA_CHANNEL_COUNT as u8).filter(move |&channel| self.contains(channel))
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self::ALL
    }
}

/// Channel selection for one connection
#[derive(Debug, Clone)]
pub struct ChannelSelector {
    map: ChannelMap,
    hop: u8,
    used: Vec<u8, DATA_CHANNEL_COUNT>,
    /// Channel of each connection event, indexed by event counter modulo 37
    channels: [u8; DATA_CHANNEL_COUNT],
}

impl ChannelSelector {
    pub fn new(map: ChannelMap, hop: u8) -> Result<Self, ChannelMapError> {
        let (used, channels) = Self::build(&map, hop)?;

        Ok(Self { map, hop, used, channels })
    }

    /// Apply a new channel map and hop increment.
    ///
    /// On error the previous configuration stays in place.
    pub fn reset(&mut self, map: ChannelMap, hop: u8) -> Result<(), ChannelMapError> {
        *self = Self::new(map, hop)?;
        Ok(())
    }

    /// Apply a new channel map and keep the hop increment (channel map update procedure)
    pub fn update_map(&mut self, map: ChannelMap) -> Result<(), ChannelMapError> {
        self.reset(map, self.hop)?;
        log::debug!("LL: Channel map updated, {} channels used", self.used.len());
        Ok(())
    }

    /// Data channel of the connection event with the given event counter
    pub fn data_channel(&self, event_counter: u32) -> u8 {
        // DATA_CHANNEL_COUNT fits into u32
        self.channels[(event_counter % DATA_CHANNEL_COUNT as u32) as usize]
    }

    pub fn hop_increment(&self) -> u8 {
        self.hop
    }

    pub fn channel_map(&self) -> ChannelMap {
        self.map
    }

    /// Used channels in ascending order
    pub fn used_channels(&self) -> &[u8] {
        &self.used
    }

    pub fn is_used(&self, channel: u8) -> bool {
        self.map.contains(channel)
    }

    fn build(
        map: &ChannelMap,
        hop: u8,
    ) -> Result<(Vec<u8, DATA_CHANNEL_COUNT>, [u8; DATA_CHANNEL_COUNT]), ChannelMapError> {
        if !(MIN_HOP_INCREMENT..=MAX_HOP_INCREMENT).contains(&hop) {
            log::debug!("LL: Rejected hop increment {}", hop);
            return Err(ChannelMapError::InvalidHopIncrement(hop));
        }

        // At most 37 channels, the Vec can not overflow
        let used: Vec<u8, DATA_CHANNEL_COUNT> = map.channels().collect();

        if used.len() < MIN_USED_CHANNELS {
            log::debug!("LL: Rejected channel map {:02x?}", map.to_bytes());
            return Err(ChannelMapError::TooFewChannels(used.len()));
        }

        let count = DATA_CHANNEL_COUNT as u8;
        let mut channels = [0u8; DATA_CHANNEL_COUNT];
        let mut unmapped = hop;

        for channel in channels.iter_mut() {
            *channel = if map.contains(unmapped) {
                unmapped
            } else {
                used[usize::from(unmapped) % used.len()]
            };

            unmapped = (unmapped + hop) % count;
        }

        Ok((used, channels))
    }
}
