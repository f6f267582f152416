use weather_now_core::{UiState, WeatherSnapshot};

const COMPASS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

fn compass_point(degrees: u16) -> &'static str {
    let index = ((f64::from(degrees) + 22.5) / 45.0) as usize % COMPASS.len();
    COMPASS[index]
}

fn render_snapshot(s: &WeatherSnapshot) -> String {
    let description = if s.weather_description.is_empty() {
        "no description".to_string()
    } else {
        s.weather_description.clone()
    };

    format!(
        "{city}\n  {temp:.1}°C ({description})\n  min {min:.1}°C / max {max:.1}°C\n  \
         wind {wind:.1} m/s {dir} ({deg}°)\n  humidity {humidity}%",
        city = s.city_name,
        temp = s.current_temp,
        min = s.min_temp,
        max = s.max_temp,
        wind = s.wind_speed,
        dir = compass_point(s.wind_direction),
        deg = s.wind_direction,
        humidity = s.humidity,
    )
}

pub fn render_state(state: &UiState) -> String {
    match state {
        UiState::Loading => "Loading…".to_string(),
        UiState::Success(snapshot) => render_snapshot(snapshot),
        UiState::Error(message) => format!("Error: {message}"),
    }
}
