//! Matching consumer requests against a stream's producer bindings
//!
//! For every requested media, bindings that are already connected are tried
//! first, in configured order; only if none of them can serve the media are
//! the remaining bindings dialled, again in configured order. The first
//! compatible pair wins unless the request asks for `ALL` codecs.

use std::sync::Arc;

use crate::consumer::Consumer;
use crate::error::{Error, NegotiationError};
use crate::media::{flow, match_media, Direction, Flow, Media};
use crate::producer::ProducerBinding;

/// One producer track wired to one consumer media
#[derive(Clone)]
pub(super) struct Link {
    /// Index into the consumer's requested medias
    pub media_index: usize,
    pub binding: Arc<ProducerBinding>,
}

/// Everything one negotiation run learned
pub(super) struct Outcome {
    pub links: Vec<Link>,
    /// First error of each binding during this run, in binding order
    pub errors: Vec<Option<Error>>,
    /// Producer medias looked at, for the "codecs not matched" report
    pub seen: Vec<Media>,
}

impl Outcome {
    fn new(bindings: usize) -> Self {
        Self {
            links: Vec::new(),
            errors: (0..bindings).map(|_| None).collect(),
            seen: Vec::new(),
        }
    }

    /// Bindings that ended up carrying at least one link
    pub fn used(&self) -> Vec<Arc<ProducerBinding>> {
        let mut used: Vec<Arc<ProducerBinding>> = Vec::new();
        for link in &self.links {
            if !used.iter().any(|b| b.id() == link.binding.id()) {
                used.push(Arc::clone(&link.binding));
            }
        }
        used
    }
}

/// Negotiate `requested` (index, media) pairs of `consumer` against `producers`
pub(super) async fn negotiate(
    producers: &[Arc<ProducerBinding>],
    consumer: &Arc<dyn Consumer>,
    requested: &[(usize, Media)],
) -> Outcome {
    let mut out = Outcome::new(producers.len());
    let source = consumer.source();

    for (media_index, cons_media) in requested {
        let all = cons_media.matches_all();
        let mut satisfied = false;

        for connected_pass in [true, false] {
            if satisfied && !all {
                break;
            }

            for (n, binding) in producers.iter().enumerate() {
                if out.errors[n].is_some() || binding.is_connected() != connected_pass {
                    continue;
                }

                // e.g. `camera1: ffmpeg:camera1` must not feed itself
                if source.as_deref() == Some(binding.url().as_str()) {
                    continue;
                }

                let medias = if connected_pass {
                    match binding.connected_medias() {
                        Some(medias) => medias,
                        None => continue,
                    }
                } else {
                    match binding.medias().await {
                        Ok(medias) => medias,
                        Err(e) => {
                            out.errors[n] = Some(e);
                            continue;
                        }
                    }
                };

                for prod_media in &medias {
                    out.seen.push(prod_media.clone());

                    let Some((prod_media, codec)) = match_media(cons_media, std::slice::from_ref(prod_media)) else {
                        tracing::trace!(binding = binding.id(), producer = %prod_media, consumer = %cons_media, "Media skipped");
                        continue;
                    };

                    let linked = match flow(prod_media.direction, cons_media.direction) {
                        Some(Flow::Forward) => binding
                            .attach(prod_media, codec, consumer, cons_media)
                            .await
                            .map(|track| (track, Flow::Forward)),
                        Some(Flow::Backchannel) => {
                            // Consumers without a backchannel just skip this media
                            let Ok(track) = consumer.track(cons_media, codec).await else {
                                continue;
                            };
                            binding
                                .attach_backchannel(prod_media, codec, &track)
                                .await
                                .map(|()| (track, Flow::Backchannel))
                        }
                        None => continue,
                    };

                    match linked {
                        Ok((track, flow)) => {
                            tracing::debug!(
                                binding = binding.id(),
                                flow = ?flow,
                                track = track.id(),
                                media = %cons_media,
                                codec = %codec,
                                "Track linked"
                            );
                            out.links.push(Link {
                                media_index: *media_index,
                                binding: Arc::clone(binding),
                            });
                            satisfied = true;
                            if !all {
                                break;
                            }
                        }
                        Err(e) => {
                            out.errors[n] = Some(e);
                            break;
                        }
                    }
                }

                if satisfied && !all {
                    break;
                }
            }
        }
    }

    out
}

/// Error for a negotiation that linked nothing
pub(super) fn failure(requested: &[Media], outcome: &Outcome) -> NegotiationError {
    let errors: Vec<String> = outcome.errors.iter().flatten().map(ToString::to_string).collect();
    if !errors.is_empty() {
        return NegotiationError::Producers(errors.join(", "));
    }

    if outcome.seen.is_empty() {
        return NegotiationError::NoSources;
    }

    NegotiationError::CodecsNotMatched {
        producer: codec_list(&outcome.seen, Direction::Recvonly),
        consumer: codec_list(requested, Direction::Sendonly),
    }
}

fn codec_list(medias: &[Media], direction: Direction) -> String {
    medias
        .iter()
        .filter(|m| m.direction == direction)
        .flat_map(|m| m.codecs.iter().map(move |c| format!("{}:{}", m.kind, c.print_name())))
        .collect::<Vec<_>>()
        .join(", ")
}
