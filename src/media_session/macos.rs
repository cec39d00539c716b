//! Now Playing info and remote commands through the MediaPlayer framework.

use super::{MediaCommand, MediaCommandSender, MediaMetadata, MediaSessionSurface, PositionState};
use crate::events::PlaybackState;
use block2::RcBlock;
use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2_foundation::{NSMutableDictionary, NSNumber, NSString};
use objc2_media_player::{
    MPChangePlaybackPositionCommandEvent, MPMediaItemPropertyArtist,
    MPMediaItemPropertyPlaybackDuration, MPMediaItemPropertyTitle, MPNowPlayingInfoCenter,
    MPNowPlayingInfoPropertyElapsedPlaybackTime, MPNowPlayingInfoPropertyPlaybackRate,
    MPNowPlayingPlaybackState, MPRemoteCommand, MPRemoteCommandCenter, MPRemoteCommandEvent,
    MPRemoteCommandHandlerStatus,
};
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};

/// Wrapper to make ObjC retained objects Send.
/// These tokens are only kept alive, never accessed across threads.
struct SendRetainedTokens(Vec<Retained<AnyObject>>);
unsafe impl Send for SendRetainedTokens {}

pub struct NowPlayingSurface {
    tokens: Arc<Mutex<SendRetainedTokens>>,
    metadata: Option<MediaMetadata>,
    position: Option<PositionState>,
}

impl Default for NowPlayingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl NowPlayingSurface {
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(Mutex::new(SendRetainedTokens(Vec::new()))),
            metadata: None,
            position: None,
        }
    }

    fn publish(&self) {
        let Some(metadata) = self.metadata.clone() else {
            return;
        };
        let position = self.position.unwrap_or(PositionState {
            duration: metadata.duration_seconds,
            playback_rate: 0.0,
            position: 0.0,
        });
        // MPNowPlayingInfoCenter must be updated from the main thread for the
        // system to treat the app as the Now Playing source.
        dispatch::Queue::main().exec_async(move || {
            set_now_playing_info(&metadata, &position);
        });
    }
}

impl MediaSessionSurface for NowPlayingSurface {
    fn register(&mut self, commands: MediaCommandSender) {
        let tokens = Arc::clone(&self.tokens);
        dispatch::Queue::main().exec_async(move || {
            let registered = register_remote_commands(commands);
            if let Ok(mut slot) = tokens.lock() {
                *slot = SendRetainedTokens(registered);
            }
        });
    }

    fn set_metadata(&mut self, metadata: &MediaMetadata) {
        self.metadata = Some(metadata.clone());
        self.position = None;
        self.publish();
    }

    fn set_position(&mut self, position: &PositionState) {
        self.position = Some(*position);
        self.publish();
    }

    fn set_playback_state(&mut self, state: PlaybackState) {
        dispatch::Queue::main().exec_async(move || unsafe {
            let center = MPNowPlayingInfoCenter::defaultCenter();
            center.setPlaybackState(match state {
                PlaybackState::Playing => MPNowPlayingPlaybackState::Playing,
                PlaybackState::Paused | PlaybackState::Buffering => {
                    MPNowPlayingPlaybackState::Paused
                }
                PlaybackState::Stopped => MPNowPlayingPlaybackState::Stopped,
            });
        });
    }

    fn clear(&mut self) {
        self.metadata = None;
        self.position = None;
        dispatch::Queue::main().exec_async(|| unsafe {
            let center = MPNowPlayingInfoCenter::defaultCenter();
            center.setNowPlayingInfo(None);
            center.setPlaybackState(MPNowPlayingPlaybackState::Stopped);
        });
    }
}

/// Must be called on the main thread.
///
/// `artwork_url` is not published: `MPMediaItemArtwork` wants a decoded
/// image, and this crate never downloads or decodes images.
fn set_now_playing_info(metadata: &MediaMetadata, position: &PositionState) {
    unsafe {
        let center = MPNowPlayingInfoCenter::defaultCenter();
        let dict: Retained<NSMutableDictionary<NSString, AnyObject>> = NSMutableDictionary::new();

        let title_val = NSString::from_str(&metadata.title);
        let artist_val = NSString::from_str(&metadata.artist);
        let duration_val = NSNumber::new_f64(position.duration);
        let elapsed_val = NSNumber::new_f64(position.position);
        let rate_val = NSNumber::new_f64(position.playback_rate);

        dict.insert(MPMediaItemPropertyTitle, &*title_val);
        dict.insert(MPMediaItemPropertyArtist, &*artist_val);
        dict.insert(MPMediaItemPropertyPlaybackDuration, &*duration_val);
        dict.insert(MPNowPlayingInfoPropertyElapsedPlaybackTime, &*elapsed_val);
        dict.insert(MPNowPlayingInfoPropertyPlaybackRate, &*rate_val);

        center.setNowPlayingInfo(Some(&dict));
    }
}

fn add_handler(
    command: &MPRemoteCommand,
    commands: &MediaCommandSender,
    to_command: fn(NonNull<MPRemoteCommandEvent>) -> Option<MediaCommand>,
) -> Retained<AnyObject> {
    let tx = commands.clone();
    let block = RcBlock::new(
        move |event: NonNull<MPRemoteCommandEvent>| -> MPRemoteCommandHandlerStatus {
            match to_command(event) {
                Some(cmd) if tx.send(cmd).is_ok() => MPRemoteCommandHandlerStatus::Success,
                _ => MPRemoteCommandHandlerStatus::CommandFailed,
            }
        },
    );
    unsafe {
        command.setEnabled(true);
        command.addTargetWithHandler(&block)
    }
}

/// Returns tokens that MUST be kept alive for the handlers to remain active.
fn register_remote_commands(commands: MediaCommandSender) -> Vec<Retained<AnyObject>> {
    let mut tokens = Vec::new();

    unsafe {
        let center = MPRemoteCommandCenter::sharedCommandCenter();

        tokens.push(add_handler(&center.playCommand(), &commands, |_| {
            Some(MediaCommand::Play)
        }));
        tokens.push(add_handler(&center.pauseCommand(), &commands, |_| {
            Some(MediaCommand::Pause)
        }));
        tokens.push(add_handler(
            &center.togglePlayPauseCommand(),
            &commands,
            |_| Some(MediaCommand::Toggle),
        ));
        tokens.push(add_handler(&center.nextTrackCommand(), &commands, |_| {
            Some(MediaCommand::Next)
        }));
        tokens.push(add_handler(
            &center.previousTrackCommand(),
            &commands,
            |_| Some(MediaCommand::Previous),
        ));
        tokens.push(add_handler(
            &center.changePlaybackPositionCommand(),
            &commands,
            |event| {
                let event = event.cast::<MPChangePlaybackPositionCommandEvent>();
                let position = event.as_ref().positionTime();
                Some(MediaCommand::Seek(position))
            },
        ));
    }

    log::info!("[media] remote command handlers registered ({} tokens)", tokens.len());
    tokens
}
