//! In-memory module images for tests.

#![allow(dead_code)]

pub const ROWS: usize = 64;

/// ProTracker C-1 period.
pub const C1: u16 = 856;

/// Pack one pattern event.
pub fn cell(period: u16, instrument: u8, effect: u8, param: u8) -> [u8; 4] {
    [
        (instrument & 0xf0) | ((period >> 8) as u8 & 0x0f),
        period as u8,
        ((instrument & 0x0f) << 4) | (effect & 0x0f),
        param,
    ]
}

pub struct ModImage {
    pub title: String,
    pub channels: usize,
    pub orders: Vec<u8>,
    pub restart: u8,
    pub patterns: Vec<Vec<[u8; 4]>>,
    pub sample: Vec<i8>,
}

impl ModImage {
    /// `patterns` empty patterns of `channels` channels, played in order once.
    pub fn new(channels: usize, patterns: usize) -> Self {
        ModImage {
            title: "test song".to_string(),
            channels,
            orders: (0..patterns as u8).collect(),
            restart: 127,
            patterns: vec![vec![[0u8; 4]; ROWS * channels]; patterns],
            sample: (0..256).map(|i| if i % 32 < 16 { 90 } else { -90 }).collect(),
        }
    }

    pub fn set(&mut self, pattern: usize, row: usize, channel: usize, event: [u8; 4]) -> &mut Self {
        self.patterns[pattern][row * self.channels + channel] = event;
        self
    }

    pub fn signature(&self) -> String {
        match self.channels {
            4 => "M.K.".to_string(),
            n if n < 10 => format!("{n}CHN"),
            n => format!("{n}CH"),
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = vec![0u8; 1084];
        let title = self.title.as_bytes();
        data[..title.len().min(20)].copy_from_slice(&title[..title.len().min(20)]);

        // sample 1: looped square wave at full volume
        let header = 20;
        data[header..header + 6].copy_from_slice(b"square");
        let words = (self.sample.len() / 2) as u16;
        data[header + 22..header + 24].copy_from_slice(&words.to_be_bytes());
        data[header + 25] = 64;
        data[header + 28..header + 30].copy_from_slice(&words.to_be_bytes());

        data[950] = self.orders.len() as u8;
        data[951] = self.restart;
        data[952..952 + self.orders.len()].copy_from_slice(&self.orders);
        data[1080..1084].copy_from_slice(self.signature().as_bytes());

        for pattern in &self.patterns {
            for event in pattern {
                data.extend_from_slice(event);
            }
        }
        data.extend(self.sample.iter().map(|&s| s as u8));
        data
    }
}
