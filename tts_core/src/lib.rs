//! Speech synthesis side of the relay.
//!
//! [`SynthesisStreamer`] wraps a [`SpeechSynthesisService`] and turns a reply
//! into an ordered sequence of fixed-size binary chunks written to a
//! [`ChunkSink`], pacing the writes so the transport and the client's buffer
//! are not flooded. [`OpenAiSpeechClient`] is the production service.

mod config;
mod openai;
mod stream;
mod wav;

pub use config::{AudioFormat, SpeechConfig, StreamSettings, PCM_SAMPLE_RATE};
pub use openai::OpenAiSpeechClient;
pub use stream::{
    rechunk, AudioByteStream, ChunkSink, SpeechSynthesisService, SynthesisOutcome,
    SynthesisStreamer,
};
pub use wav::pcm16_to_wav;
