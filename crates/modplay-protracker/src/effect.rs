//! ProTracker effect commands.
//!
//! Extended `Exy` commands are split into their own variants so the channel
//! code never has to look at the sub-command nibble again.

/// One decoded effect command with its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    /// No effect.
    #[default]
    None,
    /// `0xy` cycle between base note, +x and +y semitones.
    Arpeggio(u8),
    /// `1xx` slide pitch up every tick.
    PortaUp(u8),
    /// `2xx` slide pitch down every tick.
    PortaDown(u8),
    /// `3xx` glide towards the row's note.
    TonePorta(u8),
    /// `4xy` vibrato with speed x, depth y.
    Vibrato(u8),
    /// `5xy` continue tone portamento and slide volume.
    TonePortaVolumeSlide(u8),
    /// `6xy` continue vibrato and slide volume.
    VibratoVolumeSlide(u8),
    /// `7xy` tremolo with speed x, depth y.
    Tremolo(u8),
    /// `8xx` set channel panning.
    SetPanning(u8),
    /// `9xx` start sample at offset `xx * 256`.
    SampleOffset(u8),
    /// `Axy` slide volume up x or down y every tick.
    VolumeSlide(u8),
    /// `Bxx` jump to order position xx.
    PositionJump(u8),
    /// `Cxx` set channel volume.
    SetVolume(u8),
    /// `Dxy` break to row `x*10+y` of the next order position.
    PatternBreak(u8),
    /// `E1x` slide pitch up once.
    FinePortaUp(u8),
    /// `E2x` slide pitch down once.
    FinePortaDown(u8),
    /// `E4x` select vibrato waveform.
    VibratoWaveform(u8),
    /// `E5x` override the sample's fine tune.
    SetFineTune(u8),
    /// `E6x` set loop start (x = 0) or loop x times.
    PatternLoop(u8),
    /// `E7x` select tremolo waveform.
    TremoloWaveform(u8),
    /// `E9x` retrigger the sample every x ticks.
    Retrigger(u8),
    /// `EAx` raise volume once.
    FineVolumeUp(u8),
    /// `EBx` lower volume once.
    FineVolumeDown(u8),
    /// `ECx` cut the note after x ticks.
    NoteCut(u8),
    /// `EDx` delay the note by x ticks.
    NoteDelay(u8),
    /// `EEx` hold the row for x extra rows.
    PatternDelay(u8),
    /// `Fxx` set speed (below 32) or tempo.
    SetSpeed(u8),
}

impl Effect {
    /// Decode a raw effect nibble and parameter byte.
    pub fn decode(effect: u8, param: u8) -> Self {
        let (x, y) = (param >> 4, param & 0x0f);
        match effect & 0x0f {
            0x0 if param == 0 => Effect::None,
            0x0 => Effect::Arpeggio(param),
            0x1 => Effect::PortaUp(param),
            0x2 => Effect::PortaDown(param),
            0x3 => Effect::TonePorta(param),
            0x4 => Effect::Vibrato(param),
            0x5 => Effect::TonePortaVolumeSlide(param),
            0x6 => Effect::VibratoVolumeSlide(param),
            0x7 => Effect::Tremolo(param),
            0x8 => Effect::SetPanning(param),
            0x9 => Effect::SampleOffset(param),
            0xa => Effect::VolumeSlide(param),
            0xb => Effect::PositionJump(param),
            0xc => Effect::SetVolume(param),
            0xd => Effect::PatternBreak(param),
            0xe => match x {
                0x1 => Effect::FinePortaUp(y),
                0x2 => Effect::FinePortaDown(y),
                0x4 => Effect::VibratoWaveform(y),
                0x5 => Effect::SetFineTune(y),
                0x6 => Effect::PatternLoop(y),
                0x7 => Effect::TremoloWaveform(y),
                0x9 => Effect::Retrigger(y),
                0xa => Effect::FineVolumeUp(y),
                0xb => Effect::FineVolumeDown(y),
                0xc => Effect::NoteCut(y),
                0xd => Effect::NoteDelay(y),
                0xe => Effect::PatternDelay(y),
                // filter, glissando and invert loop have no audible effect here
                _ => Effect::None,
            },
            _ => Effect::SetSpeed(param),
        }
    }

    /// Whether this command suppresses the row's note trigger.
    pub(crate) fn delays_trigger(self) -> bool {
        matches!(self, Effect::NoteDelay(ticks) if ticks > 0)
    }

    /// Whether a new note glides instead of restarting the sample.
    pub(crate) fn is_tone_porta(self) -> bool {
        matches!(
            self,
            Effect::TonePorta(_) | Effect::TonePortaVolumeSlide(_)
        )
    }
}
