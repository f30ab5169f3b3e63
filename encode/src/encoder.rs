//! One codec + muxer instance.
//!
//! The encoder owns every libav resource it allocates (muxer context,
//! codec context, scaler, frame buffers) through their `ffmpeg-next`
//! wrappers, so teardown is RAII; `flush()` is the only explicit
//! lifecycle step and is idempotent.
//!
//! In-band metadata takes one of two paths, decided per frame:
//! - the encoder was opened with native SEI forwarding (`udu_sei=1`,
//!   software H.264/HEVC): attach the raw UUID+text payload as
//!   unregistered-SEI frame side data and let the codec emit the NAL;
//! - otherwise: build the SEI NAL ourselves and prepend it to each
//!   drained packet, matching the packet's own bitstream framing.

use std::path::Path;

use ffmpeg_next as ffmpeg;

use ffmpeg::software::scaling;
use ffmpeg::{codec, encoder, format, frame, Dictionary, Packet, Rational};
use libc::EAGAIN;

use tigas_core::{FrameMetadata, RgbFrame};

use crate::config::EncodeConfig;
use crate::sei::{self, SeiCodec};
use crate::{dash, Error, Result};

pub struct VideoEncoder {
    octx: format::context::Output,
    encoder: encoder::video::Encoder,
    scaler: scaling::Context,
    rgb_frame: frame::Video,
    yuv_frame: frame::Video,
    stream_index: usize,
    codec_time_base: Rational,
    stream_time_base: Rational,
    sei_codec: Option<SeiCodec>,
    native_sei: bool,
    width: i32,
    height: i32,
    next_pts: i64,
    flushed: bool,
}

fn setup_err(what: &str, err: ffmpeg::Error) -> Error {
    Error::EncoderSetupFailed(format!("{what}: {err}"))
}

fn encode_err(what: &str, err: ffmpeg::Error) -> Error {
    Error::EncodePacketFailed(format!("{what}: {err}"))
}

/// Codec-ID fallback when the exact encoder name is unknown.
fn codec_id_for_name(codec_name: &str) -> codec::Id {
    if codec_name.contains("hevc") {
        codec::Id::HEVC
    } else {
        codec::Id::H264
    }
}

fn resolve_codec(config: &EncodeConfig) -> Result<ffmpeg::Codec> {
    if config.lossless {
        return encoder::find(codec::Id::FFV1)
            .ok_or_else(|| Error::EncoderSetupFailed("FFV1 encoder not available".to_string()));
    }
    encoder::find_by_name(&config.codec_name)
        .or_else(|| encoder::find(codec_id_for_name(&config.codec_name)))
        .ok_or_else(|| {
            Error::EncoderSetupFailed(format!("no encoder for codec '{}'", config.codec_name))
        })
}

impl VideoEncoder {
    pub fn new(
        output_path: &Path,
        config: &EncodeConfig,
        width: i32,
        height: i32,
    ) -> Result<Self> {
        ffmpeg::init().map_err(|err| setup_err("libav init failed", err))?;

        let mut octx = if config.live_dash {
            format::output_as(&output_path, "dash")
        } else {
            format::output(&output_path)
        }
        .map_err(|err| {
            setup_err(
                &format!("unable to open output '{}'", output_path.display()),
                err,
            )
        })?;

        let global_header = octx
            .format()
            .flags()
            .contains(format::flag::Flags::GLOBAL_HEADER);

        let codec = resolve_codec(config)?;
        let sei_codec = match codec.id() {
            codec::Id::H264 => Some(SeiCodec::H264),
            codec::Id::HEVC => Some(SeiCodec::Hevc),
            _ => None,
        };

        let pix_fmt = if config.lossless {
            format::Pixel::YUV420P
        } else if config.is_nvenc() {
            format::Pixel::NV12
        } else {
            format::Pixel::YUV420P
        };

        let mut video = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|err| setup_err("unable to allocate codec context", err))?;
        video.set_width(width as u32);
        video.set_height(height as u32);
        video.set_format(pix_fmt);
        video.set_time_base(Rational(1, config.fps));
        video.set_frame_rate(Some(Rational(config.fps, 1)));
        video.set_gop(1);
        video.set_max_b_frames(0);
        if global_header {
            video.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut options = Dictionary::new();
        let mut native_sei = false;
        if !config.lossless {
            if config.is_nvenc() {
                options.set("preset", "p2");
                options.set("cq", &config.crf.to_string());
            } else {
                options.set("preset", "veryfast");
                options.set("crf", &config.crf.to_string());
                if sei_codec.is_some() {
                    // Forward unregistered SEI side data into the bitstream.
                    options.set("udu_sei", "1");
                    native_sei = true;
                }
            }
            options.set("tune", "zerolatency");
            options.set("bf", "0");
            options.set("g", "1");
        }

        let opened = video
            .open_with(options)
            .map_err(|err| setup_err("unable to open codec", err))?;

        let stream_index = {
            let mut ost = octx
                .add_stream(codec)
                .map_err(|err| setup_err("unable to create stream", err))?;
            ost.set_parameters(&opened);
            ost.set_time_base(Rational(1, config.fps));
            ost.index()
        };

        if config.live_dash {
            octx.write_header_with(dash::muxer_options(config))
                .map(|_| ())
        } else {
            octx.write_header()
        }
        .map_err(|err| setup_err("unable to write output header", err))?;

        // The muxer may have adjusted the stream time base during header
        // write; packets are rescaled into whatever it settled on.
        let stream_time_base = octx
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .unwrap_or(Rational(1, config.fps));

        let rgb_frame = frame::Video::new(format::Pixel::RGB24, width as u32, height as u32);
        let yuv_frame = frame::Video::new(pix_fmt, width as u32, height as u32);
        let scaler = scaling::Context::get(
            format::Pixel::RGB24,
            width as u32,
            height as u32,
            pix_fmt,
            width as u32,
            height as u32,
            scaling::Flags::BICUBIC,
        )
        .map_err(|err| setup_err("unable to initialize scaler", err))?;

        Ok(Self {
            octx,
            encoder: opened,
            scaler,
            rgb_frame,
            yuv_frame,
            stream_index,
            codec_time_base: Rational(1, config.fps),
            stream_time_base,
            sei_codec,
            native_sei,
            width,
            height,
            next_pts: 0,
            flushed: false,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Encode one frame and write every packet the codec hands back.
    pub fn encode(&mut self, frame: &RgbFrame, metadata: &FrameMetadata) -> Result<()> {
        if frame.width != self.width || frame.height != self.height {
            return Err(Error::EncodePacketFailed(format!(
                "frame {}x{} does not match encoder {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }

        let row_len = (frame.width * 3) as usize;
        let stride = self.rgb_frame.stride(0);
        {
            let data = self.rgb_frame.data_mut(0);
            for y in 0..frame.height as usize {
                data[y * stride..y * stride + row_len]
                    .copy_from_slice(&frame.data[y * row_len..(y + 1) * row_len]);
            }
        }

        make_writable(&mut self.yuv_frame)?;
        self.scaler
            .run(&self.rgb_frame, &mut self.yuv_frame)
            .map_err(|err| encode_err("pixel conversion failed", err))?;

        self.yuv_frame.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        let mut side_data_attached = false;
        if self.sei_codec.is_some() {
            let attached = attach_sei_side_data(&mut self.yuv_frame, metadata);
            side_data_attached = attached && self.native_sei;
        }

        self.encoder
            .send_frame(&self.yuv_frame)
            .map_err(|err| encode_err("unable to send frame to codec", err))?;

        let prepend = if side_data_attached {
            None
        } else {
            self.sei_codec.map(|codec| (codec, *metadata))
        };
        self.drain_packets(prepend)
    }

    fn drain_packets(&mut self, prepend: Option<(SeiCodec, FrameMetadata)>) -> Result<()> {
        let mut packet = Packet::empty();
        loop {
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => {
                    packet.set_stream(self.stream_index);
                    match prepend {
                        Some((codec, metadata)) => {
                            self.write_with_sei(&packet, codec, &metadata)?
                        }
                        None => {
                            packet.rescale_ts(self.codec_time_base, self.stream_time_base);
                            packet
                                .write_interleaved(&mut self.octx)
                                .map_err(|err| encode_err("unable to write packet", err))?;
                        }
                    }
                }
                Err(ffmpeg::Error::Other { errno: EAGAIN }) | Err(ffmpeg::Error::Eof) => break,
                Err(err) => return Err(encode_err("unable to receive packet from codec", err)),
            }
        }
        Ok(())
    }

    /// Rebuild the packet with our SEI NAL in front of the payload,
    /// keeping every timing/flag field.
    fn write_with_sei(
        &mut self,
        packet: &Packet,
        codec: SeiCodec,
        metadata: &FrameMetadata,
    ) -> Result<()> {
        let payload = packet.data().unwrap_or(&[]);
        let nal = sei::framed_for_packet(payload, codec, metadata);

        let mut buf = Vec::with_capacity(nal.len() + payload.len());
        buf.extend_from_slice(&nal);
        buf.extend_from_slice(payload);

        let mut tagged = Packet::copy(&buf);
        tagged.set_pts(packet.pts());
        tagged.set_dts(packet.dts());
        tagged.set_duration(packet.duration());
        tagged.set_flags(packet.flags());
        tagged.set_position(packet.position());
        tagged.set_stream(self.stream_index);
        tagged.rescale_ts(self.codec_time_base, self.stream_time_base);
        tagged
            .write_interleaved(&mut self.octx)
            .map_err(|err| encode_err("unable to write packet", err))
    }

    /// Drain the codec and finalize the container. Safe to call twice.
    pub fn flush(&mut self) -> Result<()> {
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;

        self.encoder
            .send_eof()
            .map_err(|err| encode_err("unable to flush codec", err))?;
        self.drain_packets(None)?;
        self.octx
            .write_trailer()
            .map_err(|err| encode_err("unable to write trailer", err))
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        if !self.flushed {
            if let Err(err) = self.flush() {
                log::warn!("encoder teardown flush failed: {err}");
            }
        }
    }
}

fn make_writable(frame: &mut frame::Video) -> Result<()> {
    // Not exposed by ffmpeg-next; the codec may still hold references to
    // the previous submission of this buffer.
    let ret = unsafe { ffmpeg::sys::av_frame_make_writable(frame.as_mut_ptr()) };
    if ret < 0 {
        return Err(Error::EncodePacketFailed(
            "frame buffer not writable".to_string(),
        ));
    }
    Ok(())
}

/// Attach the raw UUID+text payload as unregistered-SEI side data,
/// replacing whatever the previous frame left behind.
fn attach_sei_side_data(frame: &mut frame::Video, metadata: &FrameMetadata) -> bool {
    let payload = sei::side_data_payload(metadata);
    unsafe {
        ffmpeg::sys::av_frame_remove_side_data(
            frame.as_mut_ptr(),
            ffmpeg::sys::AVFrameSideDataType::AV_FRAME_DATA_SEI_UNREGISTERED,
        );
        let side_data = ffmpeg::sys::av_frame_new_side_data(
            frame.as_mut_ptr(),
            ffmpeg::sys::AVFrameSideDataType::AV_FRAME_DATA_SEI_UNREGISTERED,
            payload.len(),
        );
        if side_data.is_null() {
            return false;
        }
        std::ptr::copy_nonoverlapping(payload.as_ptr(), (*side_data).data, payload.len());
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_id_fallback_prefers_hevc_substring() {
        assert_eq!(codec_id_for_name("hevc_nvenc"), codec::Id::HEVC);
        assert_eq!(codec_id_for_name("libx265_hevc"), codec::Id::HEVC);
        assert_eq!(codec_id_for_name("h264_nvenc"), codec::Id::H264);
        assert_eq!(codec_id_for_name("libx264"), codec::Id::H264);
    }

    #[test]
    fn lossless_resolves_to_ffv1() {
        ffmpeg::init().unwrap();
        let codec = resolve_codec(&EncodeConfig::lossless(60)).unwrap();
        assert_eq!(codec.id(), codec::Id::FFV1);
    }

    #[test]
    fn unknown_codec_name_falls_back_by_id() {
        ffmpeg::init().unwrap();
        // No encoder is named like this; the id lookup takes over.
        let codec = resolve_codec(&EncodeConfig::lossy("hevc_doesnotexist", 60, 26));
        if let Ok(codec) = codec {
            assert_eq!(codec.id(), codec::Id::HEVC);
        }
    }
}
