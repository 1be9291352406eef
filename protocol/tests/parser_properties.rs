//
// Copyright 2025-2026 The Rovertel Authors. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Property tests for the command parser and line renderers

use proptest::prelude::*;
use rovertel_protocol::{Command, DataReport, MAX_LINE_BYTES, Response, Role};
use std::net::SocketAddr;

proptest! {
    #[test]
    fn parse_never_panics(line in any::<String>()) {
        let _ = Command::parse(&line);
    }

    #[test]
    fn unknown_keywords_never_parse(word in "[A-Z_]{1,12}") {
        prop_assume!(!matches!(
            word.as_str(),
            "LOGIN" | "MOVE" | "LIST_USERS" | "GET_DATA" | "PING" | "LOGOUT"
        ));
        prop_assert!(Command::parse(&word).is_err());
    }

    #[test]
    fn move_directions_round_trip(direction in "[a-zA-Z0-9_-]{1,32}") {
        let parsed = Command::parse(&format!("MOVE {direction}")).unwrap();
        prop_assert_eq!(
            parsed,
            Command::Move { direction: Some(direction.clone()) }
        );
        prop_assert_eq!(
            Response::MoveSuccess(direction.clone()).to_string(),
            format!("MOVE_SUCCESS {direction}")
        );
    }

    #[test]
    fn login_password_is_positional(password in "[!-~]{1,16}") {
        let parsed = Command::parse(&format!("LOGIN ADMIN {password}")).unwrap();
        prop_assert_eq!(
            parsed,
            Command::Login { role: Some(Role::Admin), password: Some(password) }
        );
    }

    #[test]
    fn user_list_stays_within_the_line_budget(count in 0usize..300) {
        let peers: Vec<SocketAddr> = (0..count)
            .map(|i| {
                let i = u16::try_from(i).unwrap();
                SocketAddr::from(([10, 20, (i / 250) as u8, (i % 250) as u8], 40000 + i))
            })
            .collect();
        let line = Response::UserList(peers).to_string();
        prop_assert!(line.len() <= MAX_LINE_BYTES - 1);
        prop_assert!(!line.contains('\n'));
    }

    #[test]
    fn full_reports_render_one_decimal_per_variable(
        ts in 0i64..=i64::from(u32::MAX),
        temp_tenths in 0u32..300,
        hum_tenths in 0u32..1000,
    ) {
        #[allow(clippy::cast_precision_loss)]
        let line = DataReport::full(
            ts,
            temp_tenths as f32 / 10.0,
            hum_tenths as f32 / 10.0,
        )
        .to_string();
        let expected = format!(
            "DATA {ts} TEMP={}.{};HUM={}.{}",
            temp_tenths / 10,
            temp_tenths % 10,
            hum_tenths / 10,
            hum_tenths % 10
        );
        prop_assert_eq!(line, expected);
    }
}
