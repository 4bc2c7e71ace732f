//! Request input parsing
//!
//! Conversation dates, participant lists and plain-text transcripts arrive as
//! loosely formatted strings from the command line or exported files.

use crate::domain::models::{TranscriptionResult, Utterance};
use crate::error::{AppError, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse the conversation start time and the participant list.
///
/// An empty date means now. Dates are RFC 3339 or `YYYY-MM-DD HH:MM[:SS]`
/// in UTC. Participants are comma separated; blanks are dropped.
pub fn parse_inputs(date: &str, participants: &str) -> Result<(DateTime<Utc>, Vec<String>)> {
    let date = date.trim();
    let start_time = if date.is_empty() {
        Utc::now()
    } else {
        parse_date(date)?
    };

    let participants = participants
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    Ok((start_time, participants))
}

/// End of a call lasting `duration_secs` from `start_time`; no duration means a zero-length call
pub fn end_time(start_time: DateTime<Utc>, duration_secs: Option<u64>) -> Result<DateTime<Utc>> {
    let Some(secs) = duration_secs else {
        return Ok(start_time);
    };
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|duration| start_time.checked_add_signed(duration))
        .ok_or_else(|| AppError::InvalidInput(format!("call duration of {}s is out of range", secs)))
}

fn parse_date(date: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return Ok(parsed.with_timezone(&Utc));
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(date, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "invalid date '{}', expected YYYY-MM-DD HH:MM or RFC 3339",
                date
            ))
        })
}

fn speaker_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // A name of up to four words, then a colon ending the line or followed by a blank
        Regex::new(
            r"^\s*(\p{L}[\p{L}\p{M}\p{N}.'\-]*(?:[ \t]+[\p{L}\p{M}\p{N}.'\-]+){0,3})[ \t]*:(?:[ \t]+(.*))?$",
        )
        .expect("speaker line pattern is valid")
    })
}

/// Parse a plain-text transcript of `Name: message` lines.
///
/// Lines without a speaker prefix continue the previous utterance. The line
/// number stands in for the time offset.
pub fn parse_speaker_lines(text: &str) -> TranscriptionResult {
    let mut utterances: Vec<Utterance> = Vec::new();

    for (line_number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match speaker_line().captures(line) {
            Some(captures) => utterances.push(Utterance {
                speaker: captures[1].trim().to_string(),
                text: captures
                    .get(2)
                    .map_or("", |text| text.as_str())
                    .trim()
                    .to_string(),
                start_ms: line_number as i64,
                confidence: 1.0,
            }),
            None => match utterances.last_mut() {
                Some(last) => {
                    if !last.text.is_empty() {
                        last.text.push(' ');
                    }
                    last.text.push_str(line.trim());
                }
                None => log::debug!("Skipping line {} with no speaker", line_number + 1),
            },
        }
    }

    TranscriptionResult::new(None, utterances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_inputs_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(parse_inputs("2024-03-05 14:30", "").unwrap().0, expected);
        assert_eq!(parse_inputs("2024-03-05 14:30:00", "").unwrap().0, expected);
        assert_eq!(parse_inputs("2024-03-05T15:30:00+01:00", "").unwrap().0, expected);
    }

    #[test]
    fn test_parse_inputs_rejects_bad_date() {
        assert!(matches!(
            parse_inputs("05/03/2024", ""),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_date_is_now() {
        let before = Utc::now();
        let (start, _) = parse_inputs("  ", "").unwrap();
        assert!(start >= before);
    }

    #[test]
    fn test_participants_are_split_and_trimmed() {
        let (_, participants) = parse_inputs("", " a , b,, c ").unwrap();
        assert_eq!(participants, vec!["a", "b", "c"]);
        let (_, participants) = parse_inputs("", "").unwrap();
        assert!(participants.is_empty());
    }

    #[test]
    fn test_parse_speaker_lines() {
        let text = "Ana López: Hola, ¿me escuchan?\nCarlos: Sí, perfecto.\nseguimos con la agenda\n\nAna López: Bien.";
        let result = parse_speaker_lines(text);
        let lines: Vec<(&str, &str, i64)> = result
            .utterances
            .iter()
            .map(|u| (u.speaker.as_str(), u.text.as_str(), u.start_ms))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("Ana López", "Hola, ¿me escuchan?", 0),
                ("Carlos", "Sí, perfecto. seguimos con la agenda", 1),
                ("Ana López", "Bien.", 4),
            ]
        );
    }

    #[test]
    fn test_leading_lines_without_speaker_are_skipped() {
        let result = parse_speaker_lines("WEBVTT\nAna: hola");
        assert_eq!(result.utterances.len(), 1);
        assert!(parse_speaker_lines("").is_empty());
    }

    #[test]
    fn test_colons_inside_text_continue_the_utterance() {
        let text = "Agente: Le paso el enlace
https://soporte.example.com/caso/42
Lo que le comenté ayer fue esto: reinicie el equipo
Cliente: Gracias";
        let result = parse_speaker_lines(text);
        let speakers: Vec<&str> = result.utterances.iter().map(|u| u.speaker.as_str()).collect();
        assert_eq!(speakers, vec!["Agente", "Cliente"]);
        assert_eq!(
            result.utterances[0].text,
            "Le paso el enlace https://soporte.example.com/caso/42 Lo que le comenté ayer fue esto: reinicie el equipo"
        );
    }

    #[test]
    fn test_speaker_with_empty_message() {
        let result = parse_speaker_lines("Ana:
sigo aquí");
        assert_eq!(result.utterances.len(), 1);
        assert_eq!(result.utterances[0].speaker, "Ana");
        assert_eq!(result.utterances[0].text, "sigo aquí");
    }

    #[test]
    fn test_end_time_from_duration() {
        let start = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(
            end_time(start, Some(90)).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 14, 31, 30).unwrap()
        );
        assert_eq!(end_time(start, None).unwrap(), start);
    }

    #[test]
    fn test_end_time_rejects_huge_duration() {
        let start = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        for secs in [u64::MAX, u64::MAX / 4, i64::MAX as u64 / 1000 + 1] {
            assert!(matches!(
                end_time(start, Some(secs)),
                Err(AppError::InvalidInput(_))
            ));
        }
    }
}
