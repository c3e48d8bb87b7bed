/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! # kline-client
//!
//! The two wire clients Binance exposes and nothing else: the paginated
//! `klines` REST endpoint ([`rest`]) and the daily Vision archive
//! ([`archive`]), both riding on the retrying [`transport::Transport`] and a
//! rotating [`hosts::HostPool`]. Business logic - chunk sizing, source
//! selection, checksum-retry policy, caching - lives one layer up in
//! `kline-engine`.

pub mod archive;
pub mod hosts;
pub mod rest;
pub mod transport;

pub use archive::ArchiveClient;
pub use hosts::HostPool;
pub use rest::{KlineRow, KlinesResponse, RestClient};
pub use transport::Transport;
