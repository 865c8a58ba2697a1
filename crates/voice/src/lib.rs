//! Client for a Polly text-to-speech proxy.
//!
//! The proxy exposes Amazon Polly's `DescribeVoices` and `SynthesizeSpeech`
//! behind an application's own authorization. This crate builds those
//! requests, forwards the caller's headers, and rewrites a generic SSML tag
//! vocabulary into the Polly dialect before synthesis.

pub mod config;
pub mod ssml;
pub mod tts;

pub use {
    config::{PollyConfig, SynthesisDefaults},
    tts::{
        DescribeVoicesRequest, Engine, OutputFormat, ParseValueError, PollyClient, SampleRate,
        SpeechResponse, SynthesizeRequest, TextType, Voice, authorization_headers,
    },
};
