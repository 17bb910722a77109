//! Transport, mixer and tracklist option commands

use crate::error::{Result, StateError};
use crate::iter::ChangeKind;
use crate::model::RepeatMode;
use crate::store::update;
use crate::Speaker;

impl Speaker {
    /// Start or resume playback of the current entry
    pub fn play(&self) -> Result<()> {
        let ctx = &self.context;
        ctx.command("start playback", ctx.client.play(None))
    }

    /// Play the entry at zero-based queue `index`
    pub fn play_index(&self, index: usize) -> Result<()> {
        let ctx = &self.context;
        let listing = ctx.command("get queue tracks", ctx.client.get_tl_tracks())?;
        let tlid = listing.get(index).map(|t| t.tlid).ok_or_else(|| {
            tracing::error!(
                "The index {} could not be resolved for Mopidy server at {}",
                index,
                ctx.server()
            );
            StateError::validation(format!(
                "Index {} is out of range for a queue of {}",
                index,
                listing.len()
            ))
        })?;
        ctx.command("start playback", ctx.client.play(Some(tlid)))
    }

    pub fn pause(&self) -> Result<()> {
        let ctx = &self.context;
        ctx.command("pause playback", ctx.client.pause())
    }

    pub fn stop(&self) -> Result<()> {
        let ctx = &self.context;
        ctx.command("stop playback", ctx.client.stop())
    }

    pub fn next_track(&self) -> Result<()> {
        let ctx = &self.context;
        ctx.command("skip to the next track", ctx.client.next())
    }

    pub fn previous_track(&self) -> Result<()> {
        let ctx = &self.context;
        ctx.command("skip to the previous track", ctx.client.previous())
    }

    /// Seek within the current track; returns whether the server accepted it
    pub fn seek(&self, seconds: u64) -> Result<bool> {
        let ctx = &self.context;
        ctx.command("seek", ctx.client.seek(seconds.saturating_mul(1000)))
    }

    /// Set the volume, clamped to `0..=100`
    pub fn set_volume(&self, volume: i32) -> Result<()> {
        let volume = volume.clamp(0, 100) as u8;
        let ctx = &self.context;
        ctx.command("set volume", ctx.client.set_volume(volume))?;
        ctx.apply(ChangeKind::Volume, |s| update(&mut s.volume, Some(volume)));
        Ok(())
    }

    /// Raise the volume by the configured step; no-op while volume is unknown
    pub fn volume_up(&self) -> Result<()> {
        self.step_volume(i32::from(self.context.config.volume_step))
    }

    /// Lower the volume by the configured step; no-op while volume is unknown
    pub fn volume_down(&self) -> Result<()> {
        self.step_volume(-i32::from(self.context.config.volume_step))
    }

    fn step_volume(&self, delta: i32) -> Result<()> {
        match self.volume() {
            Some(volume) => self.set_volume(i32::from(volume) + delta),
            None => Ok(()),
        }
    }

    pub fn set_mute(&self, mute: bool) -> Result<()> {
        let ctx = &self.context;
        ctx.command("set mute", ctx.client.set_mute(mute))?;
        ctx.apply(ChangeKind::Mute, |s| update(&mut s.muted, Some(mute)));
        Ok(())
    }

    pub fn set_shuffle(&self, shuffle: bool) -> Result<()> {
        let ctx = &self.context;
        ctx.command("set shuffle mode", ctx.client.set_random(shuffle))?;
        ctx.apply(ChangeKind::Options, |s| update(&mut s.shuffle, Some(shuffle)));
        Ok(())
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        let (repeat, single) = mode.to_flags();
        let ctx = &self.context;
        ctx.command("set repeat mode", ctx.client.set_repeat(repeat))?;
        ctx.command("set single mode", ctx.client.set_single(single))?;
        ctx.apply(ChangeKind::Options, |s| update(&mut s.repeat, Some(mode)));
        Ok(())
    }

    /// Set consume mode; nothing is sent when it is already `consume`
    pub fn set_consume_mode(&self, consume: bool) -> Result<()> {
        let ctx = &self.context;
        if ctx.store.read().consume == Some(consume) {
            return Ok(());
        }
        ctx.command("set consume mode", ctx.client.set_consume(consume))?;
        ctx.apply(ChangeKind::Options, |s| update(&mut s.consume, Some(consume)));
        Ok(())
    }
}
