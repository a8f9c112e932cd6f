/*
 * This file is part of autoz.
 *
 * Copyright (C) 2025 autoz contributors
 *
 * autoz is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * autoz is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with autoz. If not, see <https://www.gnu.org/licenses/>.
 */

//! autoz - Automatic Z-offset probing and calibration console
//! 
//! This library wires the calibration engine to an operator console and a simulated
//! printer, and provides configuration lookup and event logging.

pub mod config;
pub mod console;
pub mod logger;
pub mod sim;

#[cfg(test)]
pub mod test_utils;
